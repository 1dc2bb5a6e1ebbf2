//! Candles persisted on disk: kline JSON (array of arrays) or CSV.

use super::binance::parse_kline_row;
use super::{CandleSource, DataSourceError};
use crate::domain::{Candle, Decimal, TimeMs};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a candle file once per fetch.
#[derive(Debug, Clone)]
pub struct FileCandleSource {
    path: PathBuf,
}

impl FileCandleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_csv(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    /// Parse `[[ts, open, high, low, close, ...], ...]`.
    pub fn parse_json(bytes: &[u8]) -> Result<Vec<Candle>, DataSourceError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| DataSourceError::ParseError(format!("invalid JSON: {}", e)))?;
        let rows = value
            .as_array()
            .ok_or_else(|| DataSourceError::ParseError("expected a top-level array".to_string()))?;

        rows.iter()
            .enumerate()
            .map(|(index, row)| parse_kline_row(row, index))
            .collect()
    }

    /// Parse CSV with a `timestamp,open,high,low,close` header. Extra columns are ignored.
    pub fn parse_csv<R: std::io::Read>(reader: R) -> Result<Vec<Candle>, DataSourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut candles = Vec::new();
        for (index, record) in reader.deserialize::<CsvCandle>().enumerate() {
            let record = record.map_err(|e| DataSourceError::MalformedRecord {
                index,
                reason: e.to_string(),
            })?;
            candles.push(record.into_candle(index)?);
        }
        Ok(candles)
    }
}

#[derive(Debug, Deserialize)]
struct CsvCandle {
    timestamp: i64,
    open: String,
    high: String,
    low: String,
    close: String,
}

impl CsvCandle {
    fn into_candle(self, index: usize) -> Result<Candle, DataSourceError> {
        let price = |field: &str, raw: &str| {
            Decimal::from_str_canonical(raw).map_err(|e| DataSourceError::MalformedRecord {
                index,
                reason: format!("{}: {}", field, e),
            })
        };
        Ok(Candle::new(
            TimeMs::new(self.timestamp),
            price("open", &self.open)?,
            price("high", &self.high)?,
            price("low", &self.low)?,
            price("close", &self.close)?,
        ))
    }
}

#[async_trait]
impl CandleSource for FileCandleSource {
    async fn fetch_candles(&self) -> Result<Vec<Candle>, DataSourceError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            DataSourceError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let candles = if self.is_csv() {
            Self::parse_csv(bytes.as_slice())?
        } else {
            Self::parse_json(&bytes)?
        };
        debug!("Loaded {} candles from {}", candles.len(), self.path.display());
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_parse_binance_style_json() {
        let json = br#"[
            [1700000000000, "100.0", "101.5", "99.0", "100.5", "12.3", 1700000299999],
            [1700000300000, 100.5, 102, 100, 101.25]
        ]"#;
        let candles = FileCandleSource::parse_json(json).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, TimeMs::new(1_700_000_000_000));
        assert_eq!(candles[0].high, d("101.5"));
        assert_eq!(candles[1].close, d("101.25"));
    }

    #[test]
    fn test_parse_json_rejects_non_numeric_field() {
        let json = br#"[[1, "1", "1", "1", "1"], [2, "1", "x", "1", "1"]]"#;
        let err = FileCandleSource::parse_json(json).unwrap_err();
        match err {
            DataSourceError::MalformedRecord { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("high"), "{}", reason);
            }
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_json_rejects_non_array() {
        let err = FileCandleSource::parse_json(br#"{"klines": []}"#).unwrap_err();
        assert!(matches!(err, DataSourceError::ParseError(_)));
    }

    #[test]
    fn test_parse_csv() {
        let csv = "timestamp,open,high,low,close,volume\n1000, 100, 101, 99, 100.5, 3\n2000,100.5,100.5,98,98.2,4\n";
        let candles = FileCandleSource::parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, d("100"));
        assert_eq!(candles[1].low, d("98"));
    }

    #[test]
    fn test_parse_csv_bad_number() {
        let csv = "timestamp,open,high,low,close\n1000,100,101,abc,100.5\n";
        let err = FileCandleSource::parse_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataSourceError::MalformedRecord { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let source = FileCandleSource::new("/definitely/not/here/klines.json");
        let err = source.fetch_candles().await.unwrap_err();
        assert!(matches!(err, DataSourceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_from_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "timestamp,open,high,low,close").unwrap();
        writeln!(file, "0,1,2,0.5,1.5").unwrap();
        file.flush().unwrap();

        let candles = FileCandleSource::new(file.path()).fetch_candles().await.unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, d("1.5"));
    }
}

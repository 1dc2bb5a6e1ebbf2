//! Binance spot klines client with pagination and retry/backoff.

use super::{CandleSource, DataSourceError};
use crate::domain::{Candle, Decimal, TimeMs};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Largest page the klines endpoint serves.
pub const MAX_PAGE_LIMIT: u16 = 1000;

/// What to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinanceQuery {
    pub symbol: String,
    pub interval: String,
    /// Klines per request, at most [`MAX_PAGE_LIMIT`].
    pub page_limit: u16,
    /// Upper bound on requests per fetch.
    pub max_pages: usize,
    /// First open time to fetch. Without it only the latest page is fetched.
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl Default for BinanceQuery {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: "5m".to_string(),
            page_limit: MAX_PAGE_LIMIT,
            max_pages: 10,
            start_ms: None,
            end_ms: None,
        }
    }
}

impl BinanceQuery {
    fn page_params(&self, cursor: Option<i64>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", self.symbol.clone()),
            ("interval", self.interval.clone()),
            ("limit", self.page_limit.min(MAX_PAGE_LIMIT).to_string()),
        ];
        if let Some(start) = cursor {
            params.push(("startTime", start.to_string()));
        }
        if let Some(end) = self.end_ms {
            params.push(("endTime", end.to_string()));
        }
        params
    }
}

/// Candle source backed by `GET /api/v3/klines`.
#[derive(Debug, Clone)]
pub struct BinanceCandleSource {
    client: Client,
    base_url: String,
    query: BinanceQuery,
}

impl BinanceCandleSource {
    pub fn new(base_url: String, query: BinanceQuery) -> Self {
        Self {
            client: Client::new(),
            base_url,
            query,
        }
    }

    /// Route every request through an HTTP(S) proxy.
    pub fn with_proxy(
        base_url: String,
        query: BinanceQuery,
        proxy_url: &str,
    ) -> Result<Self, DataSourceError> {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| DataSourceError::Unavailable(format!("invalid proxy {}: {}", proxy_url, e)))?;
        let client = Client::builder()
            .proxy(proxy)
            .build()
            .map_err(|e| DataSourceError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            query,
        })
    }

    async fn get_page(&self, cursor: Option<i64>) -> Result<serde_json::Value, DataSourceError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let params = self.query.page_params(cursor);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&params)
                .send()
                .await
                .map_err(|e| {
                    warn!("klines request failed, retrying: {}", e);
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 || status == 418 {
                warn!("klines rate limited ({}), backing off", status);
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl CandleSource for BinanceCandleSource {
    async fn fetch_candles(&self) -> Result<Vec<Candle>, DataSourceError> {
        let query = &self.query;
        let mut candles: Vec<Candle> = Vec::new();
        let mut cursor = query.start_ms;

        for page in 0..query.max_pages.max(1) {
            debug!(
                "Fetching klines symbol={} interval={} page={} cursor={:?}",
                query.symbol, query.interval, page, cursor
            );
            let response = self.get_page(cursor).await?;
            let rows = response
                .as_array()
                .ok_or_else(|| DataSourceError::ParseError("Expected array response".to_string()))?;

            let offset = candles.len();
            for (i, row) in rows.iter().enumerate() {
                candles.push(parse_kline_row(row, offset + i)?);
            }

            let Some(last) = candles.last() else {
                break;
            };
            // Without a start time there is nothing to page from.
            if cursor.is_none() || rows.len() < usize::from(query.page_limit.min(MAX_PAGE_LIMIT)) {
                break;
            }
            let next = last.timestamp.as_ms() + 1;
            if query.end_ms.is_some_and(|end| next > end) {
                break;
            }
            if page + 1 == query.max_pages {
                warn!("Stopping after {} kline pages; range may be truncated", query.max_pages);
            }
            cursor = Some(next);
        }

        info!("Fetched {} klines for {}", candles.len(), query.symbol);
        Ok(candles)
    }
}

/// Decode one kline row: `[openTime, open, high, low, close, ...]`.
///
/// Prices may be JSON strings (as Binance sends them) or numbers.
pub fn parse_kline_row(row: &serde_json::Value, index: usize) -> Result<Candle, DataSourceError> {
    let malformed = |reason: String| DataSourceError::MalformedRecord { index, reason };

    let fields = row
        .as_array()
        .ok_or_else(|| malformed("expected an array".to_string()))?;
    if fields.len() < 5 {
        return Err(malformed(format!("expected at least 5 fields, got {}", fields.len())));
    }

    let timestamp = match &fields[0] {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| malformed("timestamp: expected integer milliseconds".to_string()))?;

    let price = |name: &str, value: &serde_json::Value| -> Result<Decimal, DataSourceError> {
        let parsed = match value {
            serde_json::Value::String(s) => Decimal::from_str_canonical(s).ok(),
            serde_json::Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
            _ => None,
        };
        parsed.ok_or_else(|| malformed(format!("{}: not a number ({})", name, value)))
    };

    Ok(Candle::new(
        TimeMs::new(timestamp),
        price("open", &fields[1])?,
        price("high", &fields[2])?,
        price("low", &fields[3])?,
        price("close", &fields[4])?,
    ))
}

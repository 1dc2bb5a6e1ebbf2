//! Mock candle source for testing without disk or network.

use super::{CandleSource, DataSourceError};
use crate::domain::Candle;
use async_trait::async_trait;

/// Returns predefined candles, or a predefined error.
#[derive(Debug, Clone, Default)]
pub struct MockCandleSource {
    candles: Vec<Candle>,
    failure: Option<DataSourceError>,
}

impl MockCandleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candle(mut self, candle: Candle) -> Self {
        self.candles.push(candle);
        self
    }

    pub fn with_candles(mut self, candles: Vec<Candle>) -> Self {
        self.candles.extend(candles);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn failing(error: DataSourceError) -> Self {
        Self {
            candles: Vec::new(),
            failure: Some(error),
        }
    }
}

#[async_trait]
impl CandleSource for MockCandleSource {
    async fn fetch_candles(&self) -> Result<Vec<Candle>, DataSourceError> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.candles.clone()),
        }
    }
}

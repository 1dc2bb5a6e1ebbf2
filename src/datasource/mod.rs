//! Candle sources: where the ordered candle sequence comes from.

use crate::domain::Candle;
use async_trait::async_trait;
use std::fmt;

pub mod binance;
pub mod file;
pub mod mock;

pub use binance::{BinanceCandleSource, BinanceQuery};
pub use file::FileCandleSource;
pub use mock::MockCandleSource;

/// Producer of a finite, time-ordered candle sequence.
///
/// The whole sequence is materialized so a run can be replayed exactly.
#[async_trait]
pub trait CandleSource: Send + Sync + fmt::Debug {
    /// Fetch every candle, ordered by timestamp ascending.
    async fn fetch_candles(&self) -> Result<Vec<Candle>, DataSourceError>;
}

/// Error type for candle source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Source missing or unreadable (e.g., file not found)
    Unavailable(String),
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Response or file is not the expected shape
    ParseError(String),
    /// A single candle record could not be decoded
    MalformedRecord { index: usize, reason: String },
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::Unavailable(msg) => write!(f, "Source unavailable: {}", msg),
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::MalformedRecord { index, reason } => {
                write!(f, "Malformed record {}: {}", index, reason)
            }
            DataSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for DataSourceError {}

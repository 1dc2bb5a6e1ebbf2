//! Candle type: one OHLC bar of market data.

use crate::domain::{Decimal, TimeMs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One OHLC price bar. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time in milliseconds since Unix epoch.
    pub timestamp: TimeMs,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Reason a candle is unusable by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandleDefect {
    #[error("{field} price must be positive, got {value}")]
    NonPositivePrice { field: &'static str, value: Decimal },
    #[error("low {low} is above open/close")]
    LowAboveBody { low: Decimal },
    #[error("high {high} is below open/close")]
    HighBelowBody { high: Decimal },
    #[error("timestamp {current} precedes previous candle at {previous}")]
    OutOfOrder { previous: TimeMs, current: TimeMs },
}

impl Candle {
    pub fn new(timestamp: TimeMs, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Check price sanity of a single bar.
    pub fn check(&self) -> Result<(), CandleDefect> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_positive() {
                return Err(CandleDefect::NonPositivePrice { field, value });
            }
        }

        if self.low > self.open || self.low > self.close {
            return Err(CandleDefect::LowAboveBody { low: self.low });
        }
        if self.high < self.open || self.high < self.close {
            return Err(CandleDefect::HighBelowBody { high: self.high });
        }
        Ok(())
    }

    /// Check that this candle may follow one stamped `previous`. Equal timestamps are allowed.
    pub fn check_follows(&self, previous: TimeMs) -> Result<(), CandleDefect> {
        if self.timestamp < previous {
            return Err(CandleDefect::OutOfOrder {
                previous,
                current: self.timestamp,
            });
        }
        Ok(())
    }
}

use crate::domain::{TimeMs, Trade};
use sha2::{Digest, Sha256};

/// Append-only record of executed trades, in execution order.
///
/// Timestamps are non-decreasing because the engine rejects out-of-order
/// candles; range queries rely on that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self { trades: Vec::new() }
    }

    pub fn append(&mut self, trade: Trade) {
        debug_assert!(self
            .trades
            .last()
            .map_or(true, |last| last.timestamp <= trade.timestamp));
        self.trades.push(trade);
    }

    pub fn extend<I: IntoIterator<Item = Trade>>(&mut self, trades: I) {
        for trade in trades {
            self.append(trade);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn open_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_open()).count()
    }

    pub fn close_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_close()).count()
    }

    /// Trades with `from <= timestamp <= to`. Missing bounds are open-ended.
    pub fn in_range(&self, from: Option<TimeMs>, to: Option<TimeMs>) -> &[Trade] {
        let start = match from {
            Some(from) => self.trades.partition_point(|t| t.timestamp < from),
            None => 0,
        };
        let end = match to {
            Some(to) => self.trades.partition_point(|t| t.timestamp <= to),
            None => self.trades.len(),
        };
        if start >= end {
            return &[];
        }
        &self.trades[start..end]
    }

    /// Hex SHA-256 over the canonical line form of every trade.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for trade in &self.trades {
            hasher.update(trade.canonical_line().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

}

impl<'a> IntoIterator for &'a TradeLedger {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

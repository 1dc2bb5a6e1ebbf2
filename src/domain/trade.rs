//! Trade type: one executed open or close.

use crate::domain::{Decimal, PositionId, TimeMs, TradeKind};
use serde::{Deserialize, Serialize};

/// Immutable ledger entry for one executed open or close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub position_id: PositionId,
    pub kind: TradeKind,
    pub timestamp: TimeMs,
    pub price: Decimal,
    pub size: Decimal,
    /// Number of open units after this trade was applied.
    pub resulting_open_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_buy_price: Option<Decimal>,
}

impl Trade {
    pub fn open(
        position_id: PositionId,
        timestamp: TimeMs,
        price: Decimal,
        size: Decimal,
        resulting_open_count: usize,
    ) -> Self {
        Self {
            position_id,
            kind: TradeKind::Open,
            timestamp,
            price,
            size,
            resulting_open_count,
            realized_pnl: None,
            matched_buy_price: None,
        }
    }

    pub fn close(
        position_id: PositionId,
        timestamp: TimeMs,
        price: Decimal,
        size: Decimal,
        resulting_open_count: usize,
        realized_pnl: Decimal,
        matched_buy_price: Decimal,
    ) -> Self {
        Self {
            position_id,
            kind: TradeKind::Close,
            timestamp,
            price,
            size,
            resulting_open_count,
            realized_pnl: Some(realized_pnl),
            matched_buy_price: Some(matched_buy_price),
        }
    }

    pub fn is_open(&self) -> bool {
        self.kind == TradeKind::Open
    }

    pub fn is_close(&self) -> bool {
        self.kind == TradeKind::Close
    }

    /// Canonical single-line form used for ledger digests.
    ///
    /// Decimals are normalized so equal values always render identically.
    pub fn canonical_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.position_id.as_u64(),
            self.kind,
            self.timestamp.as_ms(),
            self.price.to_canonical_string(),
            self.size.to_canonical_string(),
            self.resulting_open_count,
            self.realized_pnl
                .map(|p| p.to_canonical_string())
                .unwrap_or_default(),
            self.matched_buy_price
                .map(|p| p.to_canonical_string())
                .unwrap_or_default(),
        )
    }
}

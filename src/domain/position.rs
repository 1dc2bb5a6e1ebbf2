//! Position type: one open unit of exposure.

use crate::domain::{Decimal, PositionId, TimeMs};
use serde::{Deserialize, Serialize};

/// One open, all-or-nothing unit held by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: PositionId,
    pub buy_price: Decimal,
    /// Precomputed exit price; only set by policies that close per position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sell_price: Option<Decimal>,
    pub opened_at: TimeMs,
}

impl Position {
    /// Exit price for this unit at the given threshold fraction.
    ///
    /// Uses the precomputed value when one was fixed at open time.
    pub fn exit_price(&self, threshold: Decimal) -> Decimal {
        self.expected_sell_price
            .unwrap_or_else(|| self.buy_price * (Decimal::one() + threshold))
    }

    /// PnL of closing (or marking) this unit at `price` with the given notional.
    pub fn pnl_at(&self, price: Decimal, notional: Decimal) -> Decimal {
        (notional * (price / self.buy_price - Decimal::one())).to_pnl_scale()
    }
}

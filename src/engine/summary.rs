//! End-of-run valuation and the persisted result documents.

use crate::domain::{Decimal, PositionId, TimeMs, Trade};
use serde::{Deserialize, Serialize};

use super::{EngineState, StrategyConfig, TradeLedger};

/// Final aggregation of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub initial_capital: Decimal,
    pub final_value: Decimal,
    pub profit: Decimal,
    pub profit_percent: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub trade_count: usize,
    pub remaining_positions: usize,
    pub last_close: Decimal,
    pub ledger_digest: String,
}

impl ResultSummary {
    /// Value the final state: realized PnL plus each open unit marked at the
    /// last close against its own buy price.
    pub fn compute(config: &StrategyConfig, state: &EngineState, ledger: &TradeLedger) -> Self {
        let unrealized_pnl = state.unrealized_pnl(config.position_size);
        let final_value = config.initial_capital + state.realized_pnl + unrealized_pnl;
        let profit = final_value - config.initial_capital;
        let profit_percent = (final_value / config.initial_capital - Decimal::one()) * Decimal::hundred();

        Self {
            initial_capital: config.initial_capital,
            final_value,
            profit,
            profit_percent,
            realized_pnl: state.realized_pnl,
            unrealized_pnl,
            trade_count: ledger.len(),
            remaining_positions: state.open_count(),
            last_close: state.last_close,
            ledger_digest: ledger.digest(),
        }
    }
}

/// A ledger entry as written to the result document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    #[serde(flatten)]
    pub trade: Trade,
    /// RFC 3339 rendering of `timestamp`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl From<&Trade> for TradeRecord {
    fn from(trade: &Trade) -> Self {
        Self {
            trade: trade.clone(),
            time: trade.timestamp.to_iso8601(),
        }
    }
}

/// The per-run result document consumed by the chart front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDocument {
    #[serde(flatten)]
    pub summary: ResultSummary,
    pub trades: Vec<TradeRecord>,
}

impl ResultDocument {
    pub fn new(summary: ResultSummary, ledger: &TradeLedger) -> Self {
        Self {
            summary,
            trades: ledger.iter().map(TradeRecord::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPositionDetail {
    pub position_id: PositionId,
    pub buy_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sell_price: Option<Decimal>,
    pub opened_at: TimeMs,
    pub current_price: Decimal,
    pub unrealized_profit: Decimal,
    pub profit_percent: Decimal,
    pub position_size: Decimal,
}

/// Detail of the units still open at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPositionsReport {
    /// Timestamp of the final candle.
    pub as_of: TimeMs,
    pub last_price: Decimal,
    pub total_positions: usize,
    pub total_position_value: Decimal,
    pub total_unrealized_profit: Decimal,
    /// Informational only; valuation always uses per-unit buy prices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_buy_price: Option<Decimal>,
    pub positions: Vec<OpenPositionDetail>,
}

impl OpenPositionsReport {
    pub fn compute(config: &StrategyConfig, state: &EngineState) -> Self {
        let last_price = state.last_close;
        let positions: Vec<OpenPositionDetail> = state
            .open_positions
            .iter()
            .map(|p| OpenPositionDetail {
                position_id: p.id,
                buy_price: p.buy_price,
                expected_sell_price: p.expected_sell_price,
                opened_at: p.opened_at,
                current_price: last_price,
                unrealized_profit: p.pnl_at(last_price, config.position_size),
                profit_percent: ((last_price / p.buy_price - Decimal::one()) * Decimal::hundred())
                    .round_dp(4),
                position_size: config.position_size,
            })
            .collect();

        let total_positions = positions.len();
        let average_buy_price = (total_positions > 0).then(|| {
            let sum: Decimal = positions.iter().map(|p| p.buy_price).sum();
            sum / Decimal::from_usize(total_positions)
        });

        Self {
            as_of: state.last_timestamp,
            last_price,
            total_positions,
            total_position_value: config.position_size * Decimal::from_usize(total_positions),
            total_unrealized_profit: positions.iter().map(|p| p.unrealized_profit).sum(),
            average_buy_price,
            positions,
        }
    }
}

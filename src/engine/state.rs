use crate::domain::{Candle, CandleDefect, Decimal, Position, PositionId, TimeMs, Trade};
use serde::{Deserialize, Serialize};

use super::policy::{self, CloseFill};
use super::StrategyConfig;

/// Engine state threaded through a run. Each run owns exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    /// Price the drawdown/rise thresholds are measured against.
    pub reference_price: Decimal,
    /// Open units, oldest first.
    pub open_positions: Vec<Position>,
    /// Most recent fill price of an open, if any unit was ever opened.
    pub last_buy_price: Option<Decimal>,
    /// Sum of realized PnL over all closes so far.
    pub realized_pnl: Decimal,
    /// Close of the last candle seen; used for marking open units.
    pub last_close: Decimal,
    pub last_timestamp: TimeMs,
    next_position_id: u64,
}

impl EngineState {
    /// State seeded from the first candle: its close becomes the reference.
    pub fn seeded(first: &Candle) -> Self {
        Self::with_reference(first.close, first.timestamp)
    }

    /// Flat state with an explicit reference price.
    pub fn with_reference(reference_price: Decimal, at: TimeMs) -> Self {
        Self {
            reference_price,
            open_positions: Vec::new(),
            last_buy_price: None,
            realized_pnl: Decimal::zero(),
            last_close: reference_price,
            last_timestamp: at,
            next_position_id: 1,
        }
    }

    pub fn open_count(&self) -> usize {
        self.open_positions.len()
    }

    pub fn is_flat(&self) -> bool {
        self.open_positions.is_empty()
    }

    /// Mark-to-market PnL of every open unit at the last seen close.
    pub fn unrealized_pnl(&self, position_size: Decimal) -> Decimal {
        self.open_positions
            .iter()
            .map(|p| p.pnl_at(self.last_close, position_size))
            .sum()
    }

    /// Capital plus realized plus unrealized PnL.
    pub fn total_value(&self, config: &StrategyConfig) -> Decimal {
        config.initial_capital + self.realized_pnl + self.unrealized_pnl(config.position_size)
    }

    fn allocate_id(&mut self) -> PositionId {
        let id = PositionId(self.next_position_id);
        self.next_position_id += 1;
        id
    }
}

/// Advance the engine by one candle.
///
/// Returns the next state and the trades executed on this candle, opens
/// before closes. The input state is never modified; a rejected candle
/// leaves the caller's state exactly as it was.
pub fn process_candle(
    config: &StrategyConfig,
    state: &EngineState,
    candle: &Candle,
) -> Result<(EngineState, Vec<Trade>), CandleDefect> {
    candle.check()?;
    candle.check_follows(state.last_timestamp)?;

    let mut next = state.clone();
    let mut trades = Vec::new();

    // Opens.
    let open_prices = policy::plan_opens(config, state.reference_price, state.open_count(), candle);
    let opened_this_candle = !open_prices.is_empty();
    for buy_price in open_prices {
        let id = next.allocate_id();
        let expected_sell_price = config
            .precomputes_exit()
            .then(|| policy::level_above(buy_price, config.threshold_fraction, 1));
        next.open_positions.push(Position {
            id,
            buy_price,
            expected_sell_price,
            opened_at: candle.timestamp,
        });
        next.last_buy_price = Some(buy_price);
        trades.push(Trade::open(
            id,
            candle.timestamp,
            buy_price,
            config.position_size,
            next.open_count(),
        ));
        tracing::debug!(position = %id, price = %buy_price, open = next.open_count(), "open");
    }

    // Closes, planned against an immutable snapshot of the post-open book.
    let snapshot = next.open_positions.clone();
    let fills = policy::plan_closes(
        config,
        state.reference_price,
        next.last_buy_price,
        &snapshot,
        candle,
    );
    if !fills.is_empty() {
        let mut remaining = snapshot.len();
        for CloseFill { index, price } in &fills {
            let position = &snapshot[*index];
            let pnl = position.pnl_at(*price, config.position_size);
            remaining -= 1;
            next.realized_pnl += pnl;
            trades.push(Trade::close(
                position.id,
                candle.timestamp,
                *price,
                config.position_size,
                remaining,
                pnl,
                position.buy_price,
            ));
            tracing::debug!(position = %position.id, price = %price, pnl = %pnl, open = remaining, "close");
        }
        next.open_positions = snapshot
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !fills.iter().any(|f| f.index == *i))
            .map(|(_, p)| p)
            .collect();
    }

    next.reference_price = policy::next_reference(
        config,
        state.reference_price,
        next.open_count(),
        opened_this_candle,
        next.last_buy_price,
        candle.close,
    );
    next.last_close = candle.close;
    next.last_timestamp = candle.timestamp;

    debug_assert!(next.open_count() <= config.max_positions);
    Ok((next, trades))
}

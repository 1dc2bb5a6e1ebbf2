//! Trigger policy: pure open/close/rebase decisions for one candle.
//!
//! Every function here reads an immutable snapshot and returns a plan; the
//! state transition itself lives in [`super::state`].

use crate::domain::{Candle, Decimal, Position};

use super::{CloseMatchOrder, OpenTriggerMode, ReferenceRebaseRule, StrategyConfig};

/// One planned close: which snapshot index to remove and at what price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseFill {
    pub index: usize,
    pub price: Decimal,
}

/// Fractional move from `reference` down to `price`. Positive when below.
pub fn drawdown(reference: Decimal, price: Decimal) -> Decimal {
    (reference - price) / reference
}

/// Fractional move from `reference` up to `price`. Positive when above.
pub fn rise(reference: Decimal, price: Decimal) -> Decimal {
    (price - reference) / reference
}

/// Price of the `level`-th threshold below `reference`.
pub fn level_below(reference: Decimal, threshold: Decimal, level: usize) -> Decimal {
    reference * (Decimal::one() - Decimal::from_usize(level) * threshold)
}

/// Price of the `level`-th threshold above `reference`.
pub fn level_above(reference: Decimal, threshold: Decimal, level: usize) -> Decimal {
    reference * (Decimal::one() + Decimal::from_usize(level) * threshold)
}

/// Prices at which new units open on this candle, nearest level first.
pub fn plan_opens(
    config: &StrategyConfig,
    reference: Decimal,
    open_count: usize,
    candle: &Candle,
) -> Vec<Decimal> {
    let capacity = config.max_positions.saturating_sub(open_count);
    if capacity == 0 {
        return Vec::new();
    }
    let threshold = config.threshold_fraction;

    match config.open_trigger_mode {
        OpenTriggerMode::IntrabarThreshold => {
            let dd = drawdown(reference, candle.low);
            if dd < threshold {
                return Vec::new();
            }
            let levels = (dd / threshold).floor_count().min(capacity);
            (1..=levels)
                .map(|level| level_below(reference, threshold, level))
                .filter(|price| *price >= candle.low)
                .collect()
        }
        OpenTriggerMode::ClosePriceOnly => {
            if drawdown(reference, candle.close) >= threshold {
                vec![candle.close]
            } else {
                Vec::new()
            }
        }
    }
}

/// Snapshot indices in the order units are matched for closing.
pub fn match_order(order: CloseMatchOrder, len: usize) -> Box<dyn Iterator<Item = usize>> {
    match order {
        CloseMatchOrder::Fifo => Box::new(0..len),
        CloseMatchOrder::Lifo => Box::new((0..len).rev()),
    }
}

/// Units to close on this candle, in execution order.
///
/// `positions` is the snapshot after this candle's opens, oldest first.
/// `last_buy` is the most recent fill price of the run, if any.
pub fn plan_closes(
    config: &StrategyConfig,
    reference: Decimal,
    last_buy: Option<Decimal>,
    positions: &[Position],
    candle: &Candle,
) -> Vec<CloseFill> {
    if positions.is_empty() {
        return Vec::new();
    }
    let threshold = config.threshold_fraction;
    let mut order = match_order(config.close_match_order, positions.len());

    match config.open_trigger_mode {
        OpenTriggerMode::IntrabarThreshold => {
            let up = rise(reference, candle.high);
            if up < threshold {
                return Vec::new();
            }
            let sell_reference = if positions.len() >= config.max_positions {
                last_buy.unwrap_or(reference)
            } else {
                reference
            };
            let levels = (up / threshold).floor_count().min(positions.len());

            let mut fills = Vec::new();
            for level in 1..=levels {
                let price = level_above(sell_reference, threshold, level);
                if price > candle.high {
                    break;
                }
                match order.next() {
                    Some(index) => fills.push(CloseFill { index, price }),
                    None => break,
                }
            }
            fills
        }
        OpenTriggerMode::ClosePriceOnly => order
            .find(|&index| candle.close >= positions[index].exit_price(threshold))
            .map(|index| {
                vec![CloseFill {
                    index,
                    price: candle.close,
                }]
            })
            .unwrap_or_default(),
    }
}

/// Reference price to carry into the next candle.
pub fn next_reference(
    config: &StrategyConfig,
    current: Decimal,
    open_count: usize,
    opened_this_candle: bool,
    last_buy: Option<Decimal>,
    close: Decimal,
) -> Decimal {
    let flat = open_count == 0;
    match config.reference_rebase_rule {
        ReferenceRebaseRule::ToCloseWhenFlat => {
            if flat {
                close
            } else {
                current
            }
        }
        ReferenceRebaseRule::ToLastBuyWhenFull => {
            if flat {
                close
            } else if open_count >= config.max_positions {
                last_buy.unwrap_or(current)
            } else {
                current
            }
        }
        ReferenceRebaseRule::ToLastBuyAlways => match last_buy {
            Some(price) if opened_this_candle => price,
            _ if flat => close,
            _ => current,
        },
    }
}

//! Domain types for the grid backtester.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Primitives: TimeMs, PositionId, TradeKind
//! - Candle, Position and Trade records

pub mod candle;
pub mod decimal;
pub mod position;
pub mod primitives;
pub mod trade;

pub use candle::{Candle, CandleDefect};
pub use decimal::{Decimal, PNL_SCALE};
pub use position::Position;
pub use primitives::{PositionId, TimeMs, TradeKind};
pub use trade::Trade;

//! Pure, deterministic simulation engine for the threshold grid strategy.
//!
//! A run is a strict fold of `(state, candle) -> (state', trades)` over an
//! ordered candle sequence. Nothing in here performs I/O or reads the clock.

use crate::domain::{Decimal, TimeMs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod ledger;
pub mod policy;
pub mod simulation;
pub mod state;
pub mod summary;
pub mod sweep;

pub use ledger::TradeLedger;
pub use simulation::{run_simulation, SimulationOutcome, Simulator};
pub use state::{process_candle, EngineState};
pub use summary::{OpenPositionDetail, OpenPositionsReport, ResultDocument, ResultSummary};
pub use sweep::{ParamSweep, SweepEntry};

/// Which market data decides opens and closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenTriggerMode {
    /// Use the candle's low/high; may fill several threshold levels per candle.
    IntrabarThreshold,
    /// Use only the close; at most one open and one close per candle.
    ClosePriceOnly,
}

/// Which open unit is matched first when closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloseMatchOrder {
    Fifo,
    Lifo,
}

/// How the reference price moves after each candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceRebaseRule {
    /// Rebase to the close whenever the book is flat.
    ToCloseWhenFlat,
    /// As `ToCloseWhenFlat`, plus rebase to the last fill when the cap is reached.
    ToLastBuyWhenFull,
    /// Rebase to the last fill after every candle that opened a unit;
    /// otherwise to the close when flat.
    ToLastBuyAlways,
}

/// Fixed configuration triples reproducing the two historical strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyPreset {
    /// Intrabar multi-level grid with a shared reference price.
    IntrabarGrid,
    /// Close-price ladder where each unit carries its own exit price.
    ClosePriceLadder,
}

impl StrategyPreset {
    pub fn modes(&self) -> (OpenTriggerMode, CloseMatchOrder, ReferenceRebaseRule) {
        match self {
            StrategyPreset::IntrabarGrid => (
                OpenTriggerMode::IntrabarThreshold,
                CloseMatchOrder::Fifo,
                ReferenceRebaseRule::ToLastBuyWhenFull,
            ),
            StrategyPreset::ClosePriceLadder => (
                OpenTriggerMode::ClosePriceOnly,
                CloseMatchOrder::Lifo,
                ReferenceRebaseRule::ToLastBuyAlways,
            ),
        }
    }
}

/// Parameters of one simulation run. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    pub initial_capital: Decimal,
    /// Fixed notional committed per unit.
    pub position_size: Decimal,
    pub max_positions: usize,
    /// Distance between grid levels as a fraction of the reference (0.005 = 0.5%).
    pub threshold_fraction: Decimal,
    pub open_trigger_mode: OpenTriggerMode,
    pub close_match_order: CloseMatchOrder,
    pub reference_rebase_rule: ReferenceRebaseRule,
}

impl StrategyConfig {
    /// Build a config from a preset's mode triple.
    pub fn from_preset(
        preset: StrategyPreset,
        initial_capital: Decimal,
        position_size: Decimal,
        max_positions: usize,
        threshold_fraction: Decimal,
    ) -> Self {
        let (open_trigger_mode, close_match_order, reference_rebase_rule) = preset.modes();
        Self {
            initial_capital,
            position_size,
            max_positions,
            threshold_fraction,
            open_trigger_mode,
            close_match_order,
            reference_rebase_rule,
        }
    }

    /// Whether opened units carry a precomputed exit price.
    pub fn precomputes_exit(&self) -> bool {
        self.open_trigger_mode == OpenTriggerMode::ClosePriceOnly
    }

    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.initial_capital.is_positive() {
            return Err(SimulationError::ConfigurationInvalid(format!(
                "initialCapital must be > 0, got {}",
                self.initial_capital
            )));
        }
        if !self.position_size.is_positive() {
            return Err(SimulationError::ConfigurationInvalid(format!(
                "positionSize must be > 0, got {}",
                self.position_size
            )));
        }
        if self.max_positions == 0 {
            return Err(SimulationError::ConfigurationInvalid(
                "maxPositions must be > 0".to_string(),
            ));
        }
        if !self.threshold_fraction.is_positive() || self.threshold_fraction >= Decimal::one() {
            return Err(SimulationError::ConfigurationInvalid(format!(
                "thresholdFraction must be in (0, 1), got {}",
                self.threshold_fraction
            )));
        }
        Ok(())
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::from_preset(
            StrategyPreset::IntrabarGrid,
            Decimal::from_usize(10_000),
            Decimal::from_usize(1_000),
            10,
            Decimal::new(rust_decimal::Decimal::new(5, 3)),
        )
    }
}

/// Fatal errors of a simulation run. None are recovered mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("input unavailable: {0}")]
    InputUnavailable(String),
    #[error("malformed candle at index {index} ({}): {reason}", describe_timestamp(.timestamp))]
    MalformedCandle {
        index: usize,
        timestamp: Option<TimeMs>,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),
}

fn describe_timestamp(timestamp: &Option<TimeMs>) -> String {
    match timestamp {
        Some(ts) => format!("timestamp {}", ts),
        None => "timestamp unknown".to_string(),
    }
}

use crate::domain::{Candle, Trade};
use tracing::info;

use super::{
    process_candle, EngineState, OpenPositionsReport, ResultSummary, SimulationError,
    StrategyConfig, TradeLedger,
};

/// Step-wise driver owning one run's state and ledger.
///
/// Stopping early is simply not calling [`Simulator::step`] again.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: StrategyConfig,
    state: EngineState,
    ledger: TradeLedger,
    next_index: usize,
}

impl Simulator {
    /// Validate the configuration and seed the reference from `first`.
    pub fn start(config: StrategyConfig, first: &Candle) -> Result<Self, SimulationError> {
        config.validate()?;
        first
            .check()
            .map_err(|defect| SimulationError::MalformedCandle {
                index: 0,
                timestamp: Some(first.timestamp),
                reason: defect.to_string(),
            })?;

        Ok(Self {
            config,
            state: EngineState::seeded(first),
            ledger: TradeLedger::new(),
            next_index: 1,
        })
    }

    /// Feed the next candle. On error the state is left as before the call.
    pub fn step(&mut self, candle: &Candle) -> Result<&[Trade], SimulationError> {
        let index = self.next_index;
        let (next, trades) = process_candle(&self.config, &self.state, candle).map_err(|defect| {
            SimulationError::MalformedCandle {
                index,
                timestamp: Some(candle.timestamp),
                reason: defect.to_string(),
            }
        })?;

        self.state = next;
        self.next_index += 1;
        let before = self.ledger.len();
        self.ledger.extend(trades);
        Ok(&self.ledger.as_slice()[before..])
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    /// Close the run and value it.
    pub fn finish(self) -> SimulationOutcome {
        let summary = ResultSummary::compute(&self.config, &self.state, &self.ledger);
        let open_positions = OpenPositionsReport::compute(&self.config, &self.state);
        SimulationOutcome {
            config: self.config,
            candles_processed: self.next_index,
            final_state: self.state,
            ledger: self.ledger,
            summary,
            open_positions,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub config: StrategyConfig,
    /// Number of candles consumed, including the seeding candle.
    pub candles_processed: usize,
    pub final_state: EngineState,
    pub ledger: TradeLedger,
    pub summary: ResultSummary,
    pub open_positions: OpenPositionsReport,
}

/// Run the strategy over a full candle sequence.
///
/// The configuration is checked before anything else; an empty sequence is
/// rejected; any malformed candle aborts the whole run.
pub fn run_simulation(
    config: &StrategyConfig,
    candles: &[Candle],
) -> Result<SimulationOutcome, SimulationError> {
    config.validate()?;
    let (first, rest) = candles.split_first().ok_or_else(|| {
        SimulationError::InputUnavailable("candle sequence is empty".to_string())
    })?;

    let mut simulator = Simulator::start(config.clone(), first)?;
    for candle in rest {
        simulator.step(candle)?;
    }
    let outcome = simulator.finish();

    info!(
        candles = outcome.candles_processed,
        trades = outcome.summary.trade_count,
        remaining = outcome.summary.remaining_positions,
        final_value = %outcome.summary.final_value,
        "simulation finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, TimeMs};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn candle(ts: i64, o: &str, h: &str, l: &str, c: &str) -> Candle {
        Candle::new(TimeMs::new(ts), d(o), d(h), d(l), d(c))
    }

    #[test]
    fn test_empty_sequence_is_input_unavailable() {
        let err = run_simulation(&StrategyConfig::default(), &[]).unwrap_err();
        assert!(matches!(err, SimulationError::InputUnavailable(_)));
    }

    #[test]
    fn test_invalid_config_checked_before_input() {
        let config = StrategyConfig {
            max_positions: 0,
            ..StrategyConfig::default()
        };
        let err = run_simulation(&config, &[]).unwrap_err();
        assert!(matches!(err, SimulationError::ConfigurationInvalid(_)));
    }

    #[test]
    fn test_single_candle_only_seeds() {
        let outcome =
            run_simulation(&StrategyConfig::default(), &[candle(0, "100", "101", "90", "100")])
                .unwrap();
        assert!(outcome.ledger.is_empty());
        assert_eq!(outcome.final_state.reference_price, d("100"));
        assert_eq!(outcome.summary.final_value, d("10000"));
        assert_eq!(outcome.candles_processed, 1);
    }

    #[test]
    fn test_malformed_candle_reports_index() {
        let candles = vec![
            candle(0, "100", "100", "100", "100"),
            candle(60, "100", "100", "99", "99.5"),
            candle(30, "100", "100", "99", "99.5"),
        ];
        let err = run_simulation(&StrategyConfig::default(), &candles).unwrap_err();
        match err {
            SimulationError::MalformedCandle { index, timestamp, .. } => {
                assert_eq!(index, 2);
                assert_eq!(timestamp, Some(TimeMs::new(30)));
            }
            other => panic!("expected MalformedCandle, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_seed_candle_rejected() {
        let err = run_simulation(
            &StrategyConfig::default(),
            &[candle(0, "100", "100", "0", "100")],
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::MalformedCandle { index: 0, .. }));
    }

    #[test]
    fn test_step_returns_only_new_trades() {
        let mut sim =
            Simulator::start(StrategyConfig::default(), &candle(0, "100", "100", "100", "100")).unwrap();
        let first = sim.step(&candle(1, "100", "100", "99", "99")).unwrap().len();
        let second = sim.step(&candle(2, "99", "99", "99", "99")).unwrap().len();
        assert_eq!(first, 2);
        // Same two levels fill again while the reference holds at 100.
        assert_eq!(second, 2);
        assert_eq!(sim.ledger().len(), 4);

        let failed = sim.step(&candle(1, "99", "99", "99", "99"));
        assert!(failed.is_err());
        assert_eq!(sim.state().open_count(), 4);
        assert_eq!(sim.ledger().len(), 4);
    }
}

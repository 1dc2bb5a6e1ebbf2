//! Parameter sweeps: many independent runs over one candle sequence.

use rayon::prelude::*;

use crate::domain::{Candle, Decimal};

use super::{run_simulation, ResultSummary, SimulationError, StrategyConfig};

/// Result of one configuration in a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepEntry {
    pub config: StrategyConfig,
    pub summary: ResultSummary,
}

/// Runs one simulation per configuration, optionally in parallel.
///
/// Runs never share state; parallelism is across runs only.
#[derive(Debug, Clone, Copy)]
pub struct ParamSweep {
    parallel: bool,
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Copies of `base` differing only in threshold fraction.
    pub fn threshold_grid(base: &StrategyConfig, thresholds: &[Decimal]) -> Vec<StrategyConfig> {
        thresholds
            .iter()
            .map(|&threshold_fraction| StrategyConfig {
                threshold_fraction,
                ..base.clone()
            })
            .collect()
    }

    /// Execute every configuration. Results keep the input order.
    pub fn run(
        &self,
        candles: &[Candle],
        configs: &[StrategyConfig],
    ) -> Result<Vec<SweepEntry>, SimulationError> {
        let run_one = |config: &StrategyConfig| {
            run_simulation(config, candles).map(|outcome| SweepEntry {
                config: config.clone(),
                summary: outcome.summary,
            })
        };

        if self.parallel {
            configs.par_iter().map(run_one).collect()
        } else {
            configs.iter().map(run_one).collect()
        }
    }

    /// Entry with the highest final value; earliest wins ties.
    pub fn best(entries: &[SweepEntry]) -> Option<&SweepEntry> {
        entries.iter().fold(None, |best: Option<&SweepEntry>, entry| match best {
            Some(b) if b.summary.final_value >= entry.summary.final_value => Some(b),
            _ => Some(entry),
        })
    }
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

//! Wiring between candle sources, the engine and the result documents.

pub mod runner;

pub use runner::{BacktestRunner, RunArtifacts, RunError};

use crate::datasource::{CandleSource, DataSourceError};
use crate::domain::Candle;
use crate::engine::{
    run_simulation, ResultDocument, SimulationError, SimulationOutcome, StrategyConfig,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Loads candles from a source and runs one simulation over them.
#[derive(Debug, Clone)]
pub struct BacktestRunner {
    source: Arc<dyn CandleSource>,
    strategy: StrategyConfig,
}

/// Inputs and outputs of one finished run.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub candles: Vec<Candle>,
    pub outcome: SimulationOutcome,
}

impl RunArtifacts {
    pub fn document(&self) -> ResultDocument {
        ResultDocument::new(self.outcome.summary.clone(), &self.outcome.ledger)
    }

    /// Write the result document and the open-positions detail as pretty JSON.
    pub async fn write_documents(
        &self,
        result_path: impl AsRef<Path>,
        open_positions_path: impl AsRef<Path>,
    ) -> Result<(), RunError> {
        write_json(result_path.as_ref(), &self.document()).await?;
        write_json(open_positions_path.as_ref(), &self.outcome.open_positions).await?;
        info!(
            "Wrote {} and {}",
            result_path.as_ref().display(),
            open_positions_path.as_ref().display()
        );
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("simulation task failed: {0}")]
    Join(String),
}

impl BacktestRunner {
    pub fn new(source: Arc<dyn CandleSource>, strategy: StrategyConfig) -> Self {
        Self { source, strategy }
    }

    /// Load all candles from the source.
    ///
    /// Undecodable records surface as malformed candles; anything else means
    /// the input is unavailable.
    pub async fn load_candles(&self) -> Result<Vec<Candle>, SimulationError> {
        self.source.fetch_candles().await.map_err(|e| match e {
            DataSourceError::MalformedRecord { index, reason } => {
                SimulationError::MalformedCandle {
                    index,
                    timestamp: None,
                    reason,
                }
            }
            other => SimulationError::InputUnavailable(other.to_string()),
        })
    }

    /// Validate the strategy, load candles and run the simulation.
    pub async fn run(&self) -> Result<RunArtifacts, RunError> {
        self.strategy.validate()?;
        let candles = self.load_candles().await?;
        info!("Loaded {} candles", candles.len());

        let strategy = self.strategy.clone();
        let (candles, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = run_simulation(&strategy, &candles);
            (candles, outcome)
        })
        .await
        .map_err(|e| RunError::Join(e.to_string()))?;

        Ok(RunArtifacts {
            candles,
            outcome: outcome?,
        })
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RunError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })
}

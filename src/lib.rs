pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{CandleSource, DataSourceError, FileCandleSource, MockCandleSource};
pub use domain::{Candle, Decimal, Position, PositionId, TimeMs, Trade, TradeKind};
pub use engine::{run_simulation, SimulationError, StrategyConfig, StrategyPreset};
pub use error::AppError;

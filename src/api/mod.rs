//! Read-only HTTP view over a finished run, for the chart front end.

pub mod candles;
pub mod health;
pub mod positions;
pub mod result;
pub mod trades;

use crate::orchestration::RunArtifacts;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub artifacts: Arc<RunArtifacts>,
}

impl AppState {
    pub fn new(artifacts: RunArtifacts) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/result", get(result::get_result))
        .route("/v1/trades", get(trades::get_trades))
        .route("/v1/candles", get(candles::get_candles))
        .route("/v1/positions", get(positions::get_open_positions))
        .layer(cors)
        .with_state(state)
}

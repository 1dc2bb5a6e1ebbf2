use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::engine::{ResultSummary, StrategyConfig};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    #[serde(flatten)]
    pub summary: ResultSummary,
    pub strategy: StrategyConfig,
    pub candle_count: usize,
}

pub async fn get_result(State(state): State<AppState>) -> Json<ResultResponse> {
    let artifacts = &state.artifacts;
    Json(ResultResponse {
        summary: artifacts.outcome.summary.clone(),
        strategy: artifacts.outcome.config.clone(),
        candle_count: artifacts.candles.len(),
    })
}

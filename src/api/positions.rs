use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::engine::OpenPositionsReport;

pub async fn get_open_positions(State(state): State<AppState>) -> Json<OpenPositionsReport> {
    Json(state.artifacts.outcome.open_positions.clone())
}

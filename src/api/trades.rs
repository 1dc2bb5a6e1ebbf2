use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::TimeMs;
use crate::engine::summary::TradeRecord;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeRecord>,
}

pub async fn get_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    let from_ms = params.from_ms.map(TimeMs::new);
    let to_ms = params.to_ms.map(TimeMs::new);

    if let (Some(from), Some(to)) = (from_ms, to_ms) {
        if from > to {
            return Err(AppError::BadRequest("fromMs must be <= toMs".to_string()));
        }
    }

    let trades = state
        .artifacts
        .outcome
        .ledger
        .in_range(from_ms, to_ms)
        .iter()
        .map(TradeRecord::from)
        .collect();

    Ok(Json(TradesResponse { trades }))
}

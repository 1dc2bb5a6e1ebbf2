use axum::extract::State;
use axum::Json;

use super::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once a run has been loaded; reports what is being served.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let outcome = &state.artifacts.outcome;
    Json(serde_json::json!({
        "status": "ready",
        "candles": state.artifacts.candles.len(),
        "trades": outcome.ledger.len(),
        "ledgerDigest": outcome.summary.ledger_digest,
    }))
}

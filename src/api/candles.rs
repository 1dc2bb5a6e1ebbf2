use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{Candle, Decimal, TimeMs, TradeKind};
use crate::error::AppError;

pub const DEFAULT_PER_PAGE: usize = 300;
pub const MAX_PER_PAGE: usize = 5000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlesQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// Chart overlay marker for one trade.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeMarker {
    pub timestamp: TimeMs,
    pub kind: TradeKind,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlesPage {
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub total_candles: usize,
    pub candles: Vec<Candle>,
    pub markers: Vec<TradeMarker>,
}

pub async fn get_candles(
    Query(params): Query<CandlesQuery>,
    State(state): State<AppState>,
) -> Result<Json<CandlesPage>, AppError> {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if page == 0 {
        return Err(AppError::BadRequest("page is 1-based".to_string()));
    }
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(AppError::BadRequest(format!(
            "perPage must be between 1 and {}",
            MAX_PER_PAGE
        )));
    }

    let all = &state.artifacts.candles;
    let total_candles = all.len();
    let total_pages = total_candles.div_ceil(per_page);
    if total_pages > 0 && page > total_pages {
        return Err(AppError::NotFound(format!(
            "page {} of {}",
            page, total_pages
        )));
    }

    let start = ((page - 1) * per_page).min(total_candles);
    let end = (start + per_page).min(total_candles);
    let candles = all[start..end].to_vec();

    let markers = match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => state
            .artifacts
            .outcome
            .ledger
            .in_range(Some(first.timestamp), Some(last.timestamp))
            .iter()
            .map(|t| TradeMarker {
                timestamp: t.timestamp,
                kind: t.kind,
                price: t.price,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(Json(CandlesPage {
        page,
        per_page,
        total_pages,
        total_candles,
        candles,
        markers,
    }))
}

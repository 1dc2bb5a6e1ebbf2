use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use gridsim::datasource::{BinanceCandleSource, BinanceQuery, CandleSource, DataSourceError};
use gridsim::domain::TimeMs;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const INTERVAL_MS: i64 = 300_000;

#[derive(Clone)]
struct FakeExchange {
    total: i64,
    requests: Arc<AtomicUsize>,
    /// Answer this many requests with `failure` before serving klines.
    failing: usize,
    failure: StatusCode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KlinesParams {
    symbol: String,
    limit: i64,
    start_time: Option<i64>,
    end_time: Option<i64>,
}

async fn klines(
    State(exchange): State<FakeExchange>,
    Query(params): Query<KlinesParams>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let seen = exchange.requests.fetch_add(1, Ordering::SeqCst);
    if seen < exchange.failing {
        return Err((exchange.failure, "try again later".to_string()));
    }
    if params.symbol != "BTCUSDT" {
        return Err((StatusCode::BAD_REQUEST, "Invalid symbol.".to_string()));
    }

    let start = params.start_time.unwrap_or(0);
    let end = params
        .end_time
        .unwrap_or((exchange.total - 1) * INTERVAL_MS)
        .min((exchange.total - 1) * INTERVAL_MS);
    let rows: Vec<serde_json::Value> = (0..exchange.total)
        .map(|i| i * INTERVAL_MS)
        .filter(|ts| *ts >= start && *ts <= end)
        .take(params.limit as usize)
        .map(|ts| {
            let price = format!("{}.00", 100 + ts / INTERVAL_MS);
            serde_json::json!([ts, price, price, price, price, "1.0", ts + INTERVAL_MS - 1])
        })
        .collect();
    Ok(Json(serde_json::Value::Array(rows)))
}

async fn spawn_exchange(total: i64) -> (String, Arc<AtomicUsize>) {
    spawn_flaky_exchange(total, 0, StatusCode::OK).await
}

async fn spawn_flaky_exchange(
    total: i64,
    failing: usize,
    failure: StatusCode,
) -> (String, Arc<AtomicUsize>) {
    let requests = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/api/v3/klines", get(klines))
        .with_state(FakeExchange {
            total,
            requests: requests.clone(),
            failing,
            failure,
        });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), requests)
}

fn query(page_limit: u16, max_pages: usize) -> BinanceQuery {
    BinanceQuery {
        page_limit,
        max_pages,
        start_ms: Some(0),
        ..BinanceQuery::default()
    }
}

#[tokio::test]
async fn test_pages_until_short_page() {
    let (url, requests) = spawn_exchange(7).await;
    let source = BinanceCandleSource::new(url, query(3, 10));

    let candles = source.fetch_candles().await.unwrap();

    assert_eq!(candles.len(), 7);
    assert_eq!(requests.load(Ordering::SeqCst), 3);
    let timestamps: Vec<TimeMs> = candles.iter().map(|c| c.timestamp).collect();
    let expected: Vec<TimeMs> = (0..7).map(|i| TimeMs::new(i * INTERVAL_MS)).collect();
    assert_eq!(timestamps, expected);
}

#[tokio::test]
async fn test_page_cap_truncates() {
    let (url, requests) = spawn_exchange(20).await;
    let source = BinanceCandleSource::new(url, query(5, 2));

    let candles = source.fetch_candles().await.unwrap();

    assert_eq!(candles.len(), 10);
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_end_time_stops_paging() {
    let (url, _) = spawn_exchange(20).await;
    let source = BinanceCandleSource::new(
        url,
        BinanceQuery {
            end_ms: Some(5 * INTERVAL_MS),
            ..query(3, 10)
        },
    );

    let candles = source.fetch_candles().await.unwrap();
    assert_eq!(candles.len(), 6);
    assert_eq!(candles[5].timestamp, TimeMs::new(5 * INTERVAL_MS));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (url, requests) = spawn_exchange(5).await;
    let source = BinanceCandleSource::new(
        url,
        BinanceQuery {
            symbol: "NOPE".to_string(),
            ..query(3, 10)
        },
    );

    let err = source.fetch_candles().await.unwrap_err();
    assert_eq!(
        err,
        DataSourceError::HttpError {
            status: 400,
            message: "Client error".to_string()
        }
    );
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_latest_page_only_without_start() {
    let (url, requests) = spawn_exchange(4).await;
    let source = BinanceCandleSource::new(
        url,
        BinanceQuery {
            start_ms: None,
            ..query(3, 10)
        },
    );

    let candles = source.fetch_candles().await.unwrap();
    assert_eq!(candles.len(), 3);
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let (url, requests) = spawn_flaky_exchange(2, 1, StatusCode::SERVICE_UNAVAILABLE).await;
    let source = BinanceCandleSource::new(url, query(3, 10));

    let candles = source.fetch_candles().await.unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let (url, requests) = spawn_flaky_exchange(2, 1, StatusCode::TOO_MANY_REQUESTS).await;
    let source = BinanceCandleSource::new(url, query(3, 10));

    let candles = source.fetch_candles().await.unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

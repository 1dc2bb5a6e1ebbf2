use gridsim::datasource::{DataSourceError, FileCandleSource, MockCandleSource};
use gridsim::domain::{Candle, Decimal, TimeMs};
use gridsim::engine::{SimulationError, StrategyConfig};
use gridsim::orchestration::{BacktestRunner, RunError};
use std::sync::Arc;
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

const KLINES: &str = r#"[
    [1700000000000, "100.00", "100.00", "100.00", "100.00", "1.0", 1700000299999],
    [1700000300000, "100.00", "100.00", "98.50", "99.00", "1.0", 1700000599999],
    [1700000600000, "99.60", "101.00", "99.60", "100.80", "1.0", 1700000899999],
    [1700000900000, "100.80", "100.90", "99.20", "99.30", "1.0", 1700001199999]
]"#;

#[tokio::test]
async fn test_file_run_writes_both_documents() {
    let temp = TempDir::new().unwrap();
    let klines = temp.path().join("klines.json");
    std::fs::write(&klines, KLINES).unwrap();
    let result_path = temp.path().join("backtest_result.json");
    let open_path = temp.path().join("open_positions_detailed.json");

    let runner = BacktestRunner::new(
        Arc::new(FileCandleSource::new(&klines)),
        StrategyConfig::default(),
    );
    let artifacts = runner.run().await.unwrap();
    assert_eq!(artifacts.candles.len(), 4);
    assert_eq!(artifacts.outcome.candles_processed, 4);

    artifacts
        .write_documents(&result_path, &open_path)
        .await
        .unwrap();

    let result: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&result_path).unwrap()).unwrap();
    let trades = result["trades"].as_array().unwrap();
    assert_eq!(trades.len(), artifacts.outcome.ledger.len());
    assert_eq!(result["tradeCount"], trades.len());
    assert_eq!(
        result["ledgerDigest"],
        artifacts.outcome.summary.ledger_digest.as_str()
    );
    assert_eq!(trades[0]["kind"], "open");
    assert_eq!(trades[0]["time"], "2023-11-14T22:18:20.000Z");

    let open: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&open_path).unwrap()).unwrap();
    assert_eq!(open["asOf"], 1_700_000_900_000i64);
    assert_eq!(
        open["totalPositions"],
        artifacts.outcome.final_state.open_count()
    );
    assert_eq!(
        open["positions"].as_array().unwrap().len(),
        artifacts.outcome.final_state.open_count()
    );
}

#[tokio::test]
async fn test_csv_and_json_inputs_agree() {
    let temp = TempDir::new().unwrap();
    let json_path = temp.path().join("klines.json");
    let csv_path = temp.path().join("klines.csv");
    std::fs::write(&json_path, KLINES).unwrap();
    std::fs::write(
        &csv_path,
        "timestamp,open,high,low,close\n\
         1700000000000,100.00,100.00,100.00,100.00\n\
         1700000300000,100.00,100.00,98.50,99.00\n\
         1700000600000,99.60,101.00,99.60,100.80\n\
         1700000900000,100.80,100.90,99.20,99.30\n",
    )
    .unwrap();

    let from_json = BacktestRunner::new(
        Arc::new(FileCandleSource::new(&json_path)),
        StrategyConfig::default(),
    )
    .run()
    .await
    .unwrap();
    let from_csv = BacktestRunner::new(
        Arc::new(FileCandleSource::new(&csv_path)),
        StrategyConfig::default(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(
        from_json.outcome.summary.ledger_digest,
        from_csv.outcome.summary.ledger_digest
    );
}

#[tokio::test]
async fn test_missing_file_is_input_unavailable() {
    let temp = TempDir::new().unwrap();
    let runner = BacktestRunner::new(
        Arc::new(FileCandleSource::new(temp.path().join("absent.json"))),
        StrategyConfig::default(),
    );
    match runner.run().await.unwrap_err() {
        RunError::Simulation(SimulationError::InputUnavailable(msg)) => {
            assert!(msg.contains("absent.json"), "{}", msg)
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_candle_aborts_without_documents() {
    let source = MockCandleSource::new()
        .with_candle(Candle::new(TimeMs::new(0), d("100"), d("100"), d("100"), d("100")))
        .with_candle(Candle::new(TimeMs::new(1), d("100"), d("99"), d("98"), d("100")));
    let err = BacktestRunner::new(Arc::new(source), StrategyConfig::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::Simulation(SimulationError::MalformedCandle { index: 1, .. })
    ));
}

#[tokio::test]
async fn test_unwritable_result_path_reports_io_error() {
    let source = MockCandleSource::new()
        .with_candle(Candle::new(TimeMs::new(0), d("100"), d("100"), d("100"), d("100")));
    let artifacts = BacktestRunner::new(Arc::new(source), StrategyConfig::default())
        .run()
        .await
        .unwrap();

    let temp = TempDir::new().unwrap();
    let bad = temp.path().join("missing-dir").join("result.json");
    let err = artifacts
        .write_documents(&bad, temp.path().join("open.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Io { .. }));
}

#[tokio::test]
async fn test_rate_limited_source_is_input_unavailable() {
    let runner = BacktestRunner::new(
        Arc::new(MockCandleSource::failing(DataSourceError::RateLimited)),
        StrategyConfig::default(),
    );
    assert!(matches!(
        runner.run().await.unwrap_err(),
        RunError::Simulation(SimulationError::InputUnavailable(_))
    ));
}

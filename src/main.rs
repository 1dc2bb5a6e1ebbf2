use anyhow::Context;
use gridsim::api;
use gridsim::config::{CandleSourceKind, Config};
use gridsim::datasource::{BinanceCandleSource, CandleSource, FileCandleSource};
use gridsim::engine::ParamSweep;
use gridsim::orchestration::BacktestRunner;
use std::net::SocketAddr;
use std::sync::Arc;

fn build_source(config: &Config) -> anyhow::Result<Arc<dyn CandleSource>> {
    let source: Arc<dyn CandleSource> = match config.candle_source {
        CandleSourceKind::File => Arc::new(FileCandleSource::new(&config.candles_path)),
        CandleSourceKind::Binance => match &config.http_proxy_url {
            Some(proxy) => Arc::new(
                BinanceCandleSource::with_proxy(
                    config.binance_api_url.clone(),
                    config.binance_query.clone(),
                    proxy,
                )
                .context("invalid HTTP_PROXY_URL")?,
            ),
            None => Arc::new(BinanceCandleSource::new(
                config.binance_api_url.clone(),
                config.binance_query.clone(),
            )),
        },
    };
    Ok(source)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;

    let source = build_source(&config)?;
    let runner = BacktestRunner::new(source, config.strategy.clone());
    let artifacts = runner.run().await.context("backtest failed")?;
    artifacts
        .write_documents(&config.result_path, &config.open_positions_path)
        .await?;

    let summary = &artifacts.outcome.summary;
    tracing::info!(
        final_value = %summary.final_value,
        profit = %summary.profit,
        profit_percent = %summary.profit_percent,
        trades = summary.trade_count,
        remaining = summary.remaining_positions,
        digest = %summary.ledger_digest,
        "Backtest complete"
    );

    if !config.sweep_thresholds.is_empty() {
        let configs = ParamSweep::threshold_grid(&config.strategy, &config.sweep_thresholds);
        let candles = artifacts.candles.clone();
        let entries = tokio::task::spawn_blocking(move || ParamSweep::new().run(&candles, &configs))
            .await
            .context("sweep task failed")??;
        for entry in &entries {
            tracing::info!(
                threshold = %entry.config.threshold_fraction,
                final_value = %entry.summary.final_value,
                trades = entry.summary.trade_count,
                "Sweep result"
            );
        }
        if let Some(best) = ParamSweep::best(&entries) {
            tracing::info!(threshold = %best.config.threshold_fraction, "Best threshold");
        }
    }

    if !config.serve {
        return Ok(());
    }

    let app = api::create_router(api::AppState::new(artifacts));
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

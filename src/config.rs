use crate::datasource::BinanceQuery;
use crate::domain::Decimal;
use crate::engine::{
    CloseMatchOrder, OpenTriggerMode, ReferenceRebaseRule, StrategyConfig, StrategyPreset,
};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub serve: bool,
    pub candle_source: CandleSourceKind,
    pub candles_path: String,
    pub result_path: String,
    pub open_positions_path: String,
    pub binance_api_url: String,
    pub binance_query: BinanceQuery,
    pub http_proxy_url: Option<String>,
    pub strategy: StrategyConfig,
    pub sweep_thresholds: Vec<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleSourceKind {
    File,
    Binance,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| env_map.get(key).map(|s| s.trim()).filter(|s| !s.is_empty());

        let port = get("PORT")
            .unwrap_or("3000")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let serve = parse_bool("SERVE", get("SERVE").unwrap_or("false"))?;

        let candle_source = match get("CANDLE_SOURCE").unwrap_or("file") {
            "file" => CandleSourceKind::File,
            "binance" => CandleSourceKind::Binance,
            other => {
                return Err(ConfigError::InvalidValue(
                    "CANDLE_SOURCE".to_string(),
                    format!("must be file or binance, got {}", other),
                ))
            }
        };

        let candles_path = get("CANDLES_PATH").unwrap_or("klines.json").to_string();
        let result_path = get("RESULT_PATH")
            .unwrap_or("backtest_result.json")
            .to_string();
        let open_positions_path = get("OPEN_POSITIONS_PATH")
            .unwrap_or("open_positions_detailed.json")
            .to_string();

        let binance_api_url = get("BINANCE_API_URL")
            .unwrap_or("https://api.binance.com")
            .trim_end_matches('/')
            .to_string();
        let defaults = BinanceQuery::default();
        let binance_query = BinanceQuery {
            symbol: get("BINANCE_SYMBOL")
                .map(str::to_uppercase)
                .unwrap_or(defaults.symbol),
            interval: get("BINANCE_INTERVAL")
                .map(str::to_string)
                .unwrap_or(defaults.interval),
            page_limit: parse_or("BINANCE_PAGE_LIMIT", get("BINANCE_PAGE_LIMIT"), defaults.page_limit)?,
            max_pages: parse_or("BINANCE_MAX_PAGES", get("BINANCE_MAX_PAGES"), defaults.max_pages)?,
            start_ms: get("BINANCE_START_MS")
                .map(|s| parse_value("BINANCE_START_MS", s))
                .transpose()?,
            end_ms: get("BINANCE_END_MS")
                .map(|s| parse_value("BINANCE_END_MS", s))
                .transpose()?,
        };
        if binance_query.page_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "BINANCE_PAGE_LIMIT".to_string(),
                "must be between 1 and 1000".to_string(),
            ));
        }
        let http_proxy_url = get("HTTP_PROXY_URL").map(str::to_string);

        let strategy = parse_strategy(&get)?;

        let sweep_thresholds = match get("SWEEP_THRESHOLDS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_decimal("SWEEP_THRESHOLDS", s))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Config {
            port,
            serve,
            candle_source,
            candles_path,
            result_path,
            open_positions_path,
            binance_api_url,
            binance_query,
            http_proxy_url,
            strategy,
            sweep_thresholds,
        })
    }
}

/// Strategy parameters: preset first, then explicit mode overrides.
fn parse_strategy<'a>(
    get: &impl Fn(&str) -> Option<&'a str>,
) -> Result<StrategyConfig, ConfigError> {
    let preset = match get("STRATEGY_PRESET").unwrap_or("intrabar_grid") {
        "intrabar_grid" => StrategyPreset::IntrabarGrid,
        "close_price_ladder" => StrategyPreset::ClosePriceLadder,
        other => {
            return Err(ConfigError::InvalidValue(
                "STRATEGY_PRESET".to_string(),
                format!("must be intrabar_grid or close_price_ladder, got {}", other),
            ))
        }
    };

    let initial_capital = parse_decimal("INITIAL_CAPITAL", get("INITIAL_CAPITAL").unwrap_or("10000"))?;
    let position_size = parse_decimal("POSITION_SIZE", get("POSITION_SIZE").unwrap_or("1000"))?;
    let max_positions = parse_or("MAX_POSITIONS", get("MAX_POSITIONS"), 10usize)?;
    let threshold_fraction =
        parse_decimal("THRESHOLD_FRACTION", get("THRESHOLD_FRACTION").unwrap_or("0.005"))?;

    let mut strategy = StrategyConfig::from_preset(
        preset,
        initial_capital,
        position_size,
        max_positions,
        threshold_fraction,
    );

    if let Some(mode) = get("OPEN_TRIGGER_MODE") {
        strategy.open_trigger_mode = match mode {
            "intrabar" => OpenTriggerMode::IntrabarThreshold,
            "close" => OpenTriggerMode::ClosePriceOnly,
            other => {
                return Err(ConfigError::InvalidValue(
                    "OPEN_TRIGGER_MODE".to_string(),
                    format!("must be intrabar or close, got {}", other),
                ))
            }
        };
    }
    if let Some(order) = get("CLOSE_MATCH_ORDER") {
        strategy.close_match_order = match order.to_ascii_lowercase().as_str() {
            "fifo" => CloseMatchOrder::Fifo,
            "lifo" => CloseMatchOrder::Lifo,
            other => {
                return Err(ConfigError::InvalidValue(
                    "CLOSE_MATCH_ORDER".to_string(),
                    format!("must be fifo or lifo, got {}", other),
                ))
            }
        };
    }
    if let Some(rule) = get("REFERENCE_REBASE_RULE") {
        strategy.reference_rebase_rule = match rule {
            "close_when_flat" => ReferenceRebaseRule::ToCloseWhenFlat,
            "last_buy_when_full" => ReferenceRebaseRule::ToLastBuyWhenFull,
            "last_buy_always" => ReferenceRebaseRule::ToLastBuyAlways,
            other => {
                return Err(ConfigError::InvalidValue(
                    "REFERENCE_REBASE_RULE".to_string(),
                    format!(
                        "must be close_when_flat, last_buy_when_full, or last_buy_always, got {}",
                        other
                    ),
                ))
            }
        };
    }

    Ok(strategy)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be true or false, got {}", other),
        )),
    }
}

fn parse_decimal(key: &str, raw: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str_canonical(raw)
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), format!("not a number: {}", raw)))
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("cannot parse {}", raw))
    })
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<&str>, default: T) -> Result<T, ConfigError> {
    raw.map(|s| parse_value(key, s)).unwrap_or(Ok(default))
}

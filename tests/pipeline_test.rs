//! End-to-end pipeline tests: INI config -> strategy -> CSV candles ->
//! backtest -> risk metrics, exercising the same path the CLI drives.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;

use tradekit::adapters::csv_adapter::CsvCandleSource;
use tradekit::adapters::file_config_adapter::FileConfigAdapter;
use tradekit::cli::build_strategy;
use tradekit::domain::risk::{compute_risk_metrics, DEFAULT_CONFIDENCE};
use tradekit::domain::signal::evaluate_signals;
use tradekit::domain::simulator::{run_backtest, BacktestConfig, TradeStatus};
use tradekit::domain::strategy::TradeAction;
use tradekit::ports::data_port::CandleSource;

const STRATEGY_INI: &str = r#"
[strategy]
name = mean-reversion
indicators = RSI, SMA
rule1 = BUY | 1.0 | price <= 95
rule2 = SELL | 1.0 | price >= 105

[risk]
max_position_size = 0.1
stop_loss_pct = 20
take_profit_pct = 50
max_drawdown_pct = 90
position_sizing = percentage
"#;

/// Oscillating price path: roughly 100 +/- 10 over a slow sine, so the
/// 95/105 thresholds are crossed repeatedly.
fn write_candles_csv(dir: &std::path::Path, symbol: &str, bars: usize) {
    let mut csv = String::from("timestamp,open,high,low,close,volume\n");
    for i in 0..bars {
        let close = 100.0 + (i as f64 * 0.25).sin() * 10.0;
        let ts = 1_700_000_000_000i64 + i as i64 * 3_600_000;
        writeln!(
            csv,
            "{},{:.4},{:.4},{:.4},{:.4},{}",
            ts,
            close,
            close + 1.0,
            close - 1.0,
            close,
            1000
        )
        .unwrap();
    }
    let mut file = std::fs::File::create(dir.join(format!("{}.csv", symbol))).unwrap();
    file.write_all(csv.as_bytes()).unwrap();
}

#[test]
fn full_backtest_pipeline() {
    let dir = tempfile::TempDir::new().unwrap();
    write_candles_csv(dir.path(), "BTCUSDT", 200);

    let adapter = FileConfigAdapter::from_string(STRATEGY_INI).unwrap();
    let strategy = build_strategy(&adapter).unwrap();

    let source = CsvCandleSource::new(dir.path().to_path_buf());
    let candles = source.fetch("BTCUSDT", None, None).unwrap();
    assert_eq!(candles.len(), 200);

    let config = BacktestConfig {
        symbol: "BTCUSDT".into(),
        initial_capital: 10_000.0,
        warmup: 10,
    };
    let result = run_backtest(&strategy, &candles, &config).unwrap();

    // The oscillation crosses both thresholds several times.
    assert!(!result.trades.is_empty());
    for trade in &result.trades {
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.side, TradeAction::Buy);
        assert!(trade.exit_price.is_some());
        assert!(trade.exit_time.unwrap() >= trade.entry_time);
    }

    // Capital conservation over the whole ledger.
    let realized: f64 = result.trades.iter().filter_map(|t| t.pnl).sum();
    assert!((result.final_capital - (10_000.0 + realized)).abs() < 1e-6);

    // Buy-low/sell-high on a clean oscillation should not lose money.
    assert!(result.total_return >= 0.0);
    assert!((0.0..=1.0).contains(&result.win_rate));
}

#[test]
fn backtest_result_feeds_risk_analyzer() {
    let dir = tempfile::TempDir::new().unwrap();
    write_candles_csv(dir.path(), "ETHUSDT", 200);

    let adapter = FileConfigAdapter::from_string(STRATEGY_INI).unwrap();
    let strategy = build_strategy(&adapter).unwrap();
    let source = CsvCandleSource::new(dir.path().to_path_buf());
    let candles = source.fetch("ETHUSDT", None, None).unwrap();

    let config = BacktestConfig {
        symbol: "ETHUSDT".into(),
        initial_capital: 10_000.0,
        warmup: 10,
    };
    let result = run_backtest(&strategy, &candles, &config).unwrap();
    let returns: Vec<f64> = result
        .trades
        .iter()
        .filter_map(|t| t.pnl_pct)
        .map(|p| p / 100.0)
        .collect();
    assert!(returns.len() >= 2);

    let metrics = compute_risk_metrics(&returns, result.final_capital, DEFAULT_CONFIDENCE);
    assert_eq!(metrics.portfolio_value, result.final_capital);
    assert!(metrics.daily_var >= 0.0);
    assert!(metrics.max_drawdown >= 0.0);
    assert!(metrics.volatility >= 0.0);

    // Same inputs, same outputs.
    let again = compute_risk_metrics(&returns, result.final_capital, DEFAULT_CONFIDENCE);
    assert_eq!(metrics, again);
}

#[test]
fn signals_at_latest_bar() {
    let dir = tempfile::TempDir::new().unwrap();
    // Falling series ends at 81: the BUY threshold is met at the last bar.
    let mut csv = String::from("timestamp,open,high,low,close,volume\n");
    for i in 0..20 {
        let close = 100.0 - i as f64;
        let ts = 1_700_000_000_000i64 + i as i64 * 3_600_000;
        writeln!(csv, "{},{c},{c},{c},{c},1000", ts, c = close).unwrap();
    }
    std::fs::write(dir.path().join("SOLUSDT.csv"), csv).unwrap();

    let adapter = FileConfigAdapter::from_string(STRATEGY_INI).unwrap();
    let strategy = build_strategy(&adapter).unwrap();
    let source = CsvCandleSource::new(dir.path().to_path_buf());
    let candles = source.fetch("SOLUSDT", None, None).unwrap();

    let evaluation = evaluate_signals(&strategy, &candles);
    assert_eq!(evaluation.signals.len(), 1);
    assert_eq!(evaluation.signals[0].action, TradeAction::Buy);
    assert_eq!(evaluation.skipped_indicators, 0);
}

#[test]
fn date_range_restricts_the_run() {
    let dir = tempfile::TempDir::new().unwrap();
    write_candles_csv(dir.path(), "BTCUSDT", 200);

    let source = CsvCandleSource::new(PathBuf::from(dir.path()));
    let start = 1_700_000_000_000i64 + 50 * 3_600_000;
    let end = 1_700_000_000_000i64 + 149 * 3_600_000;
    let candles = source.fetch("BTCUSDT", Some(start), Some(end)).unwrap();

    assert_eq!(candles.len(), 100);
    assert!(candles.first().unwrap().timestamp >= start);
    assert!(candles.last().unwrap().timestamp <= end);
}

#[test]
fn results_serialize_to_json() {
    let dir = tempfile::TempDir::new().unwrap();
    write_candles_csv(dir.path(), "BTCUSDT", 120);

    let adapter = FileConfigAdapter::from_string(STRATEGY_INI).unwrap();
    let strategy = build_strategy(&adapter).unwrap();
    let source = CsvCandleSource::new(dir.path().to_path_buf());
    let candles = source.fetch("BTCUSDT", None, None).unwrap();

    let config = BacktestConfig {
        symbol: "BTCUSDT".into(),
        initial_capital: 10_000.0,
        warmup: 10,
    };
    let result = run_backtest(&strategy, &candles, &config).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"initial_capital\":10000.0"));
    assert!(json.contains("\"trades\""));
}

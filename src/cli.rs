//! CLI definition and dispatch.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::adapters::csv_adapter::CsvCandleSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::candle::Candle;
use crate::domain::error::TradekitError;
use crate::domain::risk::{compute_risk_metrics, DEFAULT_CONFIDENCE};
use crate::domain::signal::evaluate_signals;
use crate::domain::simulator::{run_backtest, BacktestConfig, DEFAULT_WARMUP};
use crate::domain::strategy::{RiskConfig, Strategy, StrategyRule};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::CandleSource;

#[derive(Parser, Debug)]
#[command(name = "tradekit", about = "Strategy backtesting and risk metrics engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and print the result as JSON
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy INI; defaults to the sections in the main config
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured symbol
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Evaluate strategy rules at the latest bar and print candidate signals
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Compute risk metrics over a return series (one return per line)
    Risk {
        #[arg(short, long)]
        returns: PathBuf,
        #[arg(long, default_value_t = 10_000.0)]
        portfolio_value: f64,
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
        confidence: f64,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            strategy,
            output,
            symbol,
        } => run_backtest_command(&config, strategy.as_ref(), output.as_ref(), symbol.as_deref()),
        Command::Signals {
            config,
            strategy,
            symbol,
        } => run_signals_command(&config, strategy.as_ref(), symbol.as_deref()),
        Command::Validate { strategy } => run_validate_command(&strategy),
        Command::Risk {
            returns,
            portfolio_value,
            confidence,
        } => run_risk_command(&returns, portfolio_value, confidence),
    }
}

fn fail(err: &TradekitError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Build a strategy from `[strategy]` and `[risk]` sections. Rules are
/// keyed `rule1..ruleN` with the shape `ACTION | weight | condition`.
pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Strategy, TradekitError> {
    let name = adapter.get_string_or("strategy", "name", "Unnamed");
    let indicators: Vec<String> = adapter
        .get_string_or("strategy", "indicators", "")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let mut rules = Vec::new();
    for n in 1.. {
        let key = format!("rule{}", n);
        match adapter.get_string("strategy", &key) {
            Ok(raw) => rules.push(parse_rule(&key, &raw)?),
            Err(_) => break,
        }
    }

    let risk = RiskConfig {
        max_position_size: adapter.get_double_or("risk", "max_position_size", 0.1),
        stop_loss_pct: adapter.get_double_or("risk", "stop_loss_pct", 5.0),
        take_profit_pct: adapter.get_double_or("risk", "take_profit_pct", 10.0),
        max_drawdown_pct: adapter.get_double_or("risk", "max_drawdown_pct", 20.0),
        position_sizing: adapter
            .get_string_or("risk", "position_sizing", "percentage")
            .parse()?,
    };

    let strategy = Strategy {
        name,
        indicators,
        rules,
        risk,
    };
    strategy.validate()?;
    Ok(strategy)
}

fn parse_rule(key: &str, raw: &str) -> Result<StrategyRule, TradekitError> {
    let parts: Vec<&str> = raw.splitn(3, '|').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(TradekitError::RuleInvalid {
            reason: format!("{}: expected 'ACTION | weight | condition', got '{}'", key, raw),
        });
    }
    let action = parts[0].parse()?;
    let weight: f64 = parts[1].parse().map_err(|_| TradekitError::RuleInvalid {
        reason: format!("{}: weight '{}' is not a number", key, parts[1]),
    })?;
    Ok(StrategyRule {
        condition: parts[2].to_string(),
        action,
        weight,
    })
}

struct LoadedRun {
    strategy: Strategy,
    candles: Vec<Candle>,
    symbol: String,
    config: FileConfigAdapter,
}

fn load_run(
    config_path: &PathBuf,
    strategy_path: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> Result<LoadedRun, ExitCode> {
    let config = load_config(config_path)?;

    let strategy = match strategy_path {
        Some(path) => {
            eprintln!("Loading strategy from {}", path.display());
            let adapter = load_config(path)?;
            build_strategy(&adapter).map_err(|e| fail(&e))?
        }
        None => build_strategy(&config).map_err(|e| fail(&e))?,
    };
    eprintln!("Loaded strategy: {}", strategy.name);

    let symbol = match symbol_override {
        Some(s) => s.to_string(),
        None => config.get_string("backtest", "symbol").map_err(|e| fail(&e))?,
    };

    let data_path = config.get_string_or("data", "path", "./data");
    let source = CsvCandleSource::new(PathBuf::from(data_path));
    let start = config.get_int("backtest", "start").ok();
    let end = config.get_int("backtest", "end").ok();
    let candles = source
        .fetch(&symbol, start, end)
        .map_err(|e| fail(&e))?;
    eprintln!("Loaded {} candles for {}", candles.len(), symbol);

    Ok(LoadedRun {
        strategy,
        candles,
        symbol,
        config,
    })
}

fn run_backtest_command(
    config_path: &PathBuf,
    strategy_path: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let run = match load_run(config_path, strategy_path, symbol_override) {
        Ok(run) => run,
        Err(code) => return code,
    };

    let bt_config = BacktestConfig {
        symbol: run.symbol.clone(),
        initial_capital: run.config.get_double_or("backtest", "initial_capital", 10_000.0),
        warmup: run.config.get_int_or("backtest", "warmup", DEFAULT_WARMUP as i64) as usize,
    };

    let result = match run_backtest(&run.strategy, &run.candles, &bt_config) {
        Ok(result) => result,
        Err(e) => return fail(&e),
    };

    eprintln!("\n=== Backtest Results: {} ===", run.symbol);
    eprintln!("Total Return:     {:.2}%", result.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", result.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", result.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", result.trades.len());
    eprintln!("Win Rate:         {:.1}%", result.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", result.profit_factor);

    emit_json(&result, output_path)
}

fn run_signals_command(
    config_path: &PathBuf,
    strategy_path: Option<&PathBuf>,
    symbol_override: Option<&str>,
) -> ExitCode {
    let run = match load_run(config_path, strategy_path, symbol_override) {
        Ok(run) => run,
        Err(code) => return code,
    };

    let evaluation = evaluate_signals(&run.strategy, &run.candles);
    eprintln!(
        "{} candidate signal(s), {} indicator(s) skipped, {} condition(s) failed",
        evaluation.signals.len(),
        evaluation.skipped_indicators,
        evaluation.failed_conditions
    );
    emit_json(&evaluation, None)
}

fn run_validate_command(strategy_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(strategy_path) {
        Ok(adapter) => adapter,
        Err(code) => return code,
    };
    match build_strategy(&adapter) {
        Ok(strategy) => {
            eprintln!(
                "Strategy '{}' is valid: {} indicator(s), {} rule(s)",
                strategy.name,
                strategy.indicators.len(),
                strategy.rules.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_risk_command(returns_path: &PathBuf, portfolio_value: f64, confidence: f64) -> ExitCode {
    if !(0.0..1.0).contains(&confidence) {
        let err = TradekitError::ConfigInvalid {
            section: "risk".into(),
            key: "confidence".into(),
            reason: "must be in [0, 1)".into(),
        };
        return fail(&err);
    }

    let returns = match read_returns(returns_path) {
        Ok(returns) => returns,
        Err(e) => return fail(&e),
    };
    eprintln!("Loaded {} returns from {}", returns.len(), returns_path.display());

    let metrics = compute_risk_metrics(&returns, portfolio_value, confidence);
    emit_json(&metrics, None)
}

/// One return per line; blank lines and `#` comments are skipped.
fn read_returns(path: &PathBuf) -> Result<Vec<f64>, TradekitError> {
    let content = std::fs::read_to_string(path)?;
    let mut returns = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: f64 = line.parse().map_err(|_| TradekitError::Data {
            reason: format!("{}:{}: '{}' is not a number", path.display(), lineno + 1, line),
        })?;
        returns.push(value);
    }
    Ok(returns)
}

fn emit_json<T: serde::Serialize>(value: &T, output_path: Option<&PathBuf>) -> ExitCode {
    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("error: failed to serialize result: {e}");
            return ExitCode::from(1);
        }
    };
    match output_path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, json) {
                return fail(&TradekitError::Io(e));
            }
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    ExitCode::SUCCESS
}

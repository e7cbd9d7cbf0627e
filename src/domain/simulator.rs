//! Bar-by-bar trade simulation.
//!
//! The position state machine is FLAT -> LONG -> FLAT. A SELL signal
//! with no open position is a no-op, never a short. Stop-loss and
//! take-profit are checked before signals on every bar and override
//! them; a max-drawdown circuit breaker blocks new entries once equity
//! has fallen too far from its peak.

use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;
use crate::domain::error::TradekitError;
use crate::domain::signal::{best_signal, evaluate_signals};
use crate::domain::strategy::{PositionSizing, RiskConfig, Strategy, TradeAction};

/// Bars to skip before trading so indicators have data to work with.
pub const DEFAULT_WARMUP: usize = 50;

/// Kelly placeholder assumptions: 60% win rate, average win 2%, average
/// loss 1%. Not fitted to any data; the fraction they produce is capped.
const KELLY_WIN_RATE: f64 = 0.6;
const KELLY_AVG_WIN: f64 = 0.02;
const KELLY_AVG_LOSS: f64 = 0.01;
const KELLY_CAP: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: TradeAction,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub entry_time: i64,
    pub exit_time: Option<i64>,
    pub pnl: Option<f64>,
    pub pnl_pct: Option<f64>,
    pub status: TradeStatus,
    pub exit_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    pub initial_capital: f64,
    pub warmup: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            symbol: "UNKNOWN".into(),
            initial_capital: 10_000.0,
            warmup: DEFAULT_WARMUP,
        }
    }
}

struct OpenPosition {
    entry_price: f64,
    entry_time: i64,
    quantity: f64,
}

/// Run a strategy over a candle series and produce the trade ledger plus
/// summary metrics.
pub fn run_backtest(
    strategy: &Strategy,
    candles: &[Candle],
    config: &BacktestConfig,
) -> Result<BacktestResult, TradekitError> {
    strategy.validate()?;
    if config.initial_capital <= 0.0 {
        return Err(TradekitError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_capital".into(),
            reason: "must be > 0".into(),
        });
    }
    if candles.len() <= config.warmup {
        return Err(TradekitError::InsufficientData {
            symbol: config.symbol.clone(),
            candles: candles.len(),
            minimum: config.warmup + 1,
        });
    }

    let risk = &strategy.risk;
    let mut capital = config.initial_capital;
    let mut position: Option<OpenPosition> = None;
    let mut trades: Vec<Trade> = Vec::new();

    let mut peak_equity = config.initial_capital;
    let mut max_drawdown = 0.0f64;
    let mut entries_blocked = false;

    for i in config.warmup..candles.len() {
        let candle = &candles[i];
        let price = candle.close;

        // Protective exits take priority over whatever the rules say.
        let mut forced_exit = false;
        if let Some(pos) = &position {
            let move_pct = (price - pos.entry_price) / pos.entry_price * 100.0;
            if risk.stop_loss_pct > 0.0 && move_pct <= -risk.stop_loss_pct {
                close_position(
                    &mut position,
                    &mut capital,
                    &mut trades,
                    config,
                    price,
                    candle.timestamp,
                    "Stop loss",
                );
                forced_exit = true;
            } else if risk.take_profit_pct > 0.0 && move_pct >= risk.take_profit_pct {
                close_position(
                    &mut position,
                    &mut capital,
                    &mut trades,
                    config,
                    price,
                    candle.timestamp,
                    "Take profit",
                );
                forced_exit = true;
            }
        }

        if !forced_exit {
            let evaluation = evaluate_signals(strategy, &candles[..=i]);
            if let Some(signal) = best_signal(&evaluation.signals) {
                match signal.action {
                    TradeAction::Buy if position.is_none() && !entries_blocked => {
                        let quantity = position_quantity(risk, capital, price);
                        let cost = quantity * price;
                        if quantity > 0.0 && cost <= capital {
                            capital -= cost;
                            position = Some(OpenPosition {
                                entry_price: price,
                                entry_time: candle.timestamp,
                                quantity,
                            });
                            tracing::debug!(bar = i, price, quantity, "opened position");
                        }
                    }
                    TradeAction::Sell if position.is_some() => {
                        close_position(
                            &mut position,
                            &mut capital,
                            &mut trades,
                            config,
                            price,
                            candle.timestamp,
                            "Signal",
                        );
                    }
                    _ => {}
                }
            }
        }

        let equity = capital + position.as_ref().map_or(0.0, |p| p.quantity * price);
        if equity > peak_equity {
            peak_equity = equity;
        }
        let drawdown = (peak_equity - equity) / peak_equity;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
        if risk.max_drawdown_pct > 0.0 && drawdown * 100.0 >= risk.max_drawdown_pct {
            if !entries_blocked {
                tracing::warn!(
                    drawdown_pct = drawdown * 100.0,
                    limit = risk.max_drawdown_pct,
                    "max drawdown reached, blocking new entries"
                );
            }
            entries_blocked = true;
        }
    }

    if position.is_some() {
        let last = &candles[candles.len() - 1];
        close_position(
            &mut position,
            &mut capital,
            &mut trades,
            config,
            last.close,
            last.timestamp,
            "Backtest end",
        );
    }

    Ok(summarize(candles, config, capital, max_drawdown, trades))
}

fn position_quantity(risk: &RiskConfig, capital: f64, price: f64) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    let fraction = match risk.position_sizing {
        PositionSizing::Fixed => 0.1,
        PositionSizing::Percentage => risk.max_position_size,
        PositionSizing::Kelly => {
            let b = KELLY_AVG_WIN / KELLY_AVG_LOSS;
            let kelly = KELLY_WIN_RATE - (1.0 - KELLY_WIN_RATE) / b;
            kelly.clamp(0.0, KELLY_CAP)
        }
    };
    capital * fraction / price
}

fn close_position(
    position: &mut Option<OpenPosition>,
    capital: &mut f64,
    trades: &mut Vec<Trade>,
    config: &BacktestConfig,
    price: f64,
    timestamp: i64,
    reason: &str,
) {
    let Some(pos) = position.take() else {
        return;
    };
    let pnl = (price - pos.entry_price) * pos.quantity;
    let pnl_pct = (price - pos.entry_price) / pos.entry_price * 100.0;
    *capital += pos.quantity * price;
    tracing::debug!(price, pnl, reason, "closed position");
    trades.push(Trade {
        symbol: config.symbol.clone(),
        side: TradeAction::Buy,
        entry_price: pos.entry_price,
        exit_price: Some(price),
        quantity: pos.quantity,
        entry_time: pos.entry_time,
        exit_time: Some(timestamp),
        pnl: Some(pnl),
        pnl_pct: Some(pnl_pct),
        status: TradeStatus::Closed,
        exit_reason: Some(reason.to_string()),
    });
}

fn summarize(
    candles: &[Candle],
    config: &BacktestConfig,
    final_capital: f64,
    max_drawdown: f64,
    trades: Vec<Trade>,
) -> BacktestResult {
    let initial = config.initial_capital;
    let total_return = (final_capital - initial) / initial;

    let span_ms = candles[candles.len() - 1].timestamp - candles[0].timestamp;
    let days = (span_ms as f64 / 86_400_000.0).max(1.0);
    let annualized_return = if total_return <= -1.0 {
        -1.0
    } else {
        (1.0 + total_return).powf(365.0 / days) - 1.0
    };

    let closed: Vec<&Trade> = trades
        .iter()
        .filter(|t| t.status == TradeStatus::Closed)
        .collect();
    let winners = closed
        .iter()
        .filter(|t| t.pnl.unwrap_or(0.0) > 0.0)
        .count();
    let win_rate = if closed.is_empty() {
        0.0
    } else {
        winners as f64 / closed.len() as f64
    };

    let gross_win: f64 = closed
        .iter()
        .filter_map(|t| t.pnl)
        .filter(|p| *p > 0.0)
        .sum();
    let gross_loss: f64 = closed
        .iter()
        .filter_map(|t| t.pnl)
        .filter(|p| *p < 0.0)
        .sum::<f64>()
        .abs();
    let profit_factor = if gross_loss > 0.0 {
        gross_win / gross_loss
    } else if gross_win > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    BacktestResult {
        initial_capital: initial,
        final_capital,
        total_return,
        annualized_return,
        max_drawdown,
        sharpe_ratio: per_trade_sharpe(&trades),
        win_rate,
        profit_factor,
        trades,
    }
}

/// Sharpe over per-trade return percentages, annualized by sqrt(365).
/// Zero when there are fewer than two trades or the returns are flat.
fn per_trade_sharpe(trades: &[Trade]) -> f64 {
    let returns: Vec<f64> = trades.iter().filter_map(|t| t.pnl_pct).collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        return 0.0;
    }
    mean / stddev * 365.0f64.sqrt()
}

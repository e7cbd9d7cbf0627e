//! Technical indicator implementations.
//!
//! This module provides types for representing indicator output:
//! - `IndicatorKind`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: Values aligned to the input series via a warm-up offset
//! - `SignalLabel`: Derived BUY/SELL/HOLD labels some indicators attach
//!
//! All functions are pure: identical input yields identical output, no
//! global state. Series shorter than an indicator's warm-up produce an
//! empty `IndicatorSeries` rather than an error.

pub mod sma;
pub mod ema;
pub mod rsi;
pub mod macd;
pub mod bollinger;
pub mod stochastic;
pub mod atr;
pub mod vwap;
pub mod momentum;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalLabel {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Atr(usize),
    Vwap,
    Momentum(usize),
}

impl IndicatorKind {
    /// Resolve a strategy's indicator name to a kind with default parameters.
    ///
    /// Single-period kinds accept an optional `_<period>` suffix
    /// (e.g. `SMA_50`). Returns `None` for unknown names; callers decide
    /// whether that is a skip or a rejection.
    pub fn parse(name: &str) -> Option<IndicatorKind> {
        let upper = name.trim().to_uppercase();
        let (base, period) = match upper.split_once('_') {
            Some((base, suffix)) => {
                let period: usize = suffix.parse().ok()?;
                if period == 0 {
                    return None;
                }
                (base.to_string(), Some(period))
            }
            None => (upper, None),
        };

        match base.as_str() {
            "SMA" => Some(IndicatorKind::Sma(period.unwrap_or(sma::DEFAULT_PERIOD))),
            "EMA" => Some(IndicatorKind::Ema(period.unwrap_or(ema::DEFAULT_PERIOD))),
            "RSI" => Some(IndicatorKind::Rsi(period.unwrap_or(rsi::DEFAULT_PERIOD))),
            "MACD" if period.is_none() => Some(IndicatorKind::Macd {
                fast: macd::DEFAULT_FAST,
                slow: macd::DEFAULT_SLOW,
                signal: macd::DEFAULT_SIGNAL,
            }),
            "BB" | "BOLLINGER" => Some(IndicatorKind::Bollinger {
                period: period.unwrap_or(bollinger::DEFAULT_PERIOD),
                stddev_mult_x100: bollinger::DEFAULT_MULT_X100,
            }),
            "STOCH" | "STOCHASTIC" => Some(IndicatorKind::Stochastic {
                k_period: period.unwrap_or(stochastic::DEFAULT_K_PERIOD),
                d_period: stochastic::DEFAULT_D_PERIOD,
            }),
            "ATR" => Some(IndicatorKind::Atr(period.unwrap_or(atr::DEFAULT_PERIOD))),
            "VWAP" if period.is_none() => Some(IndicatorKind::Vwap),
            "MOM" | "MOMENTUM" => Some(IndicatorKind::Momentum(
                period.unwrap_or(momentum::DEFAULT_PERIOD),
            )),
            _ => None,
        }
    }
}

/// A computed indicator series.
///
/// `values[k]` corresponds to input index `offset + k`; `offset` is the
/// warm-up length, so `offset + values.len() == input.len()` whenever the
/// series is non-empty. Metadata series (e.g. Bollinger upper/lower) are
/// parallel to `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub offset: usize,
    pub values: Vec<f64>,
    pub signals: Option<Vec<SignalLabel>>,
    pub metadata: HashMap<String, Vec<f64>>,
}

impl IndicatorSeries {
    pub fn empty(kind: IndicatorKind) -> Self {
        IndicatorSeries {
            kind,
            offset: 0,
            values: Vec::new(),
            signals: None,
            metadata: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Value at an absolute index into the original input series.
    pub fn value_at(&self, input_index: usize) -> Option<f64> {
        if input_index < self.offset {
            return None;
        }
        self.values.get(input_index - self.offset).copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn latest_signal(&self) -> Option<SignalLabel> {
        self.signals.as_ref().and_then(|s| s.last().copied())
    }

    pub fn latest_metadata(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(|v| v.last().copied())
    }
}

/// Compute an indicator over a candle series. Single dispatch point for
/// every consumer (simulator, signal evaluator, charting API).
pub fn compute(kind: &IndicatorKind, candles: &[Candle]) -> IndicatorSeries {
    match kind {
        IndicatorKind::Sma(period) => sma::calculate_sma(candles, *period),
        IndicatorKind::Ema(period) => ema::calculate_ema(candles, *period),
        IndicatorKind::Rsi(period) => rsi::calculate_rsi(candles, *period),
        IndicatorKind::Macd { fast, slow, signal } => {
            macd::calculate_macd(candles, *fast, *slow, *signal)
        }
        IndicatorKind::Bollinger {
            period,
            stddev_mult_x100,
        } => bollinger::calculate_bollinger(candles, *period, *stddev_mult_x100 as f64 / 100.0),
        IndicatorKind::Stochastic { k_period, d_period } => {
            stochastic::calculate_stochastic(candles, *k_period, *d_period)
        }
        IndicatorKind::Atr(period) => atr::calculate_atr(candles, *period),
        IndicatorKind::Vwap => vwap::calculate_vwap(candles),
        IndicatorKind::Momentum(period) => momentum::calculate_momentum(candles, *period),
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Ema(period) => write!(f, "EMA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorKind::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorKind::Atr(period) => write!(f, "ATR({})", period),
            IndicatorKind::Vwap => write!(f, "VWAP"),
            IndicatorKind::Momentum(period) => write!(f, "MOMENTUM({})", period),
        }
    }
}

//! Moving average convergence/divergence.

use std::collections::HashMap;

use crate::domain::candle::{closes, Candle};

use super::ema::ema_over;
use super::{IndicatorKind, IndicatorSeries};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub const SIGNAL_KEY: &str = "signal";
pub const HISTOGRAM_KEY: &str = "histogram";

/// MACD line = EMA(fast) - EMA(slow), aligned by absolute candle index.
/// Signal line = EMA(signal) of the MACD line; histogram = MACD - signal.
///
/// Values start where all three lines are defined, at warm-up
/// `slow + signal - 2`. The signal and histogram lines ride along as
/// metadata under [`SIGNAL_KEY`] and [`HISTOGRAM_KEY`].
pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal: usize,
) -> IndicatorSeries {
    let kind = IndicatorKind::Macd { fast, slow, signal };
    if fast == 0 || signal == 0 || fast >= slow {
        return IndicatorSeries::empty(kind);
    }
    let closes = closes(candles);
    let warmup = slow + signal - 2;
    if closes.len() <= warmup {
        return IndicatorSeries::empty(kind);
    }

    let fast_ema = ema_over(&closes, fast); // defined from index fast - 1
    let slow_ema = ema_over(&closes, slow); // defined from index slow - 1

    // Both EMAs exist from absolute index slow - 1 onwards.
    let macd_line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .map(|(k, &s)| fast_ema[k + (slow - fast)] - s)
        .collect();

    let signal_line = ema_over(&macd_line, signal);
    let values: Vec<f64> = macd_line[signal - 1..].to_vec();
    let histogram: Vec<f64> = values
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    let mut metadata = HashMap::new();
    metadata.insert(SIGNAL_KEY.to_string(), signal_line);
    metadata.insert(HISTOGRAM_KEY.to_string(), histogram);

    IndicatorSeries {
        kind,
        offset: warmup,
        values,
        signals: None,
        metadata,
    }
}

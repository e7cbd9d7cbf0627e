//! Stochastic oscillator.

use std::collections::HashMap;

use crate::domain::candle::Candle;

use super::sma::sma_over;
use super::{IndicatorKind, IndicatorSeries};

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

pub const D_KEY: &str = "d";

/// %K = 100 * (close - lowest low) / (highest high - lowest low) over the
/// trailing `k_period` window; %D = SMA(d_period) of %K. A flat window
/// (highest == lowest) reads a neutral 50 rather than dividing by zero.
///
/// Values begin where %D is defined; %D rides along as metadata.
pub fn calculate_stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 || candles.len() < k_period + d_period - 1 {
        return IndicatorSeries::empty(kind);
    }

    let k_line: Vec<f64> = candles
        .windows(k_period)
        .map(|window| {
            let highest = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let lowest = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let range = highest - lowest;
            if range == 0.0 {
                50.0
            } else {
                let close = window[window.len() - 1].close;
                100.0 * (close - lowest) / range
            }
        })
        .collect();

    let d_line = sma_over(&k_line, d_period);
    let values: Vec<f64> = k_line[d_period - 1..].to_vec();

    let mut metadata = HashMap::new();
    metadata.insert(D_KEY.to_string(), d_line);

    IndicatorSeries {
        kind,
        offset: k_period + d_period - 2,
        values,
        signals: None,
        metadata,
    }
}

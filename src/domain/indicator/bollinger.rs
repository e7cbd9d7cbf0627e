//! Bollinger bands.

use std::collections::HashMap;

use crate::domain::candle::{closes, Candle};

use super::{IndicatorKind, IndicatorSeries};

pub const DEFAULT_PERIOD: usize = 20;
/// Band multiplier stored as hundredths so the kind stays hashable.
pub const DEFAULT_MULT_X100: u32 = 200;

pub const UPPER_KEY: &str = "upper";
pub const LOWER_KEY: &str = "lower";

/// Middle band = SMA(period); upper/lower = middle +/- mult * stddev,
/// using the population standard deviation of each window. The middle
/// band is the primary value; upper and lower ride along as metadata.
pub fn calculate_bollinger(candles: &[Candle], period: usize, mult: f64) -> IndicatorSeries {
    let kind = IndicatorKind::Bollinger {
        period,
        stddev_mult_x100: (mult * 100.0).round() as u32,
    };
    if period == 0 || candles.len() < period {
        return IndicatorSeries::empty(kind);
    }

    let closes = closes(candles);
    let mut middle = Vec::with_capacity(closes.len() - period + 1);
    let mut upper = Vec::with_capacity(closes.len() - period + 1);
    let mut lower = Vec::with_capacity(closes.len() - period + 1);

    for window in closes.windows(period) {
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let stddev = variance.sqrt();
        middle.push(mean);
        upper.push(mean + mult * stddev);
        lower.push(mean - mult * stddev);
    }

    let mut metadata = HashMap::new();
    metadata.insert(UPPER_KEY.to_string(), upper);
    metadata.insert(LOWER_KEY.to_string(), lower);

    IndicatorSeries {
        kind,
        offset: period - 1,
        values: middle,
        signals: None,
        metadata,
    }
}

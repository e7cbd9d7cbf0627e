//! Simple moving average.

use std::collections::HashMap;

use crate::domain::candle::{closes, Candle};

use super::{IndicatorKind, IndicatorSeries};

pub const DEFAULT_PERIOD: usize = 20;

/// SMA over closes. The first value is the mean of candles `[0, period)`.
pub fn calculate_sma(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Sma(period);
    if period == 0 || candles.len() < period {
        return IndicatorSeries::empty(kind);
    }
    IndicatorSeries {
        kind,
        offset: period - 1,
        values: sma_over(&closes(candles), period),
        signals: None,
        metadata: HashMap::new(),
    }
}

/// Rolling mean over a raw series. Shared with the EMA seed and the
/// stochastic %D line.
pub(crate) fn sma_over(series: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || series.len() < period {
        return Vec::new();
    }
    series
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

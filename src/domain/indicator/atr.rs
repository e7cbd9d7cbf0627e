//! Average true range with Wilder smoothing.

use std::collections::HashMap;

use crate::domain::candle::Candle;

use super::{IndicatorKind, IndicatorSeries};

pub const DEFAULT_PERIOD: usize = 14;

/// ATR over true ranges. The first candle's true range is its high-low
/// span (no previous close); the seed is the simple mean of the first
/// `period` true ranges, then `atr = (atr * (period - 1) + tr) / period`.
pub fn calculate_atr(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Atr(period);
    if period == 0 || candles.len() < period {
        return IndicatorSeries::empty(kind);
    }

    let mut true_ranges = Vec::with_capacity(candles.len());
    true_ranges.push(candles[0].high - candles[0].low);
    for pair in candles.windows(2) {
        true_ranges.push(pair[1].true_range(pair[0].close));
    }

    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    let mut values = Vec::with_capacity(candles.len() - period + 1);
    values.push(atr);
    for &tr in &true_ranges[period..] {
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
        values.push(atr);
    }

    IndicatorSeries {
        kind,
        offset: period - 1,
        values,
        signals: None,
        metadata: HashMap::new(),
    }
}

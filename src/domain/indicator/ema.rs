//! Exponential moving average.

use std::collections::HashMap;

use crate::domain::candle::{closes, Candle};

use super::{IndicatorKind, IndicatorSeries};

pub const DEFAULT_PERIOD: usize = 20;

/// EMA over closes, seeded with the SMA of the first `period` values and
/// smoothed with `alpha = 2 / (period + 1)`.
pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Ema(period);
    let values = ema_over(&closes(candles), period);
    if values.is_empty() {
        return IndicatorSeries::empty(kind);
    }
    IndicatorSeries {
        kind,
        offset: period - 1,
        values,
        signals: None,
        metadata: HashMap::new(),
    }
}

/// EMA over a raw series; also drives the MACD lines.
pub(crate) fn ema_over(series: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || series.len() < period {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(series.len() - period + 1);
    let mut prev = series[..period].iter().sum::<f64>() / period as f64;
    values.push(prev);
    for &x in &series[period..] {
        prev = (x - prev) * alpha + prev;
        values.push(prev);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::super::test_support::make_candles;
    use super::*;

    #[test]
    fn ema_known_series() {
        // alpha = 0.5: seed = (10+11+12)/3 = 11, then 12, then 13
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let series = calculate_ema(&candles, 3);

        assert_eq!(series.offset, 2);
        assert_eq!(series.values.len(), 3);
        assert!((series.values[0] - 11.0).abs() < f64::EPSILON);
        assert!((series.values[1] - 12.0).abs() < f64::EPSILON);
        assert!((series.values[2] - 13.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_flat_series_is_flat() {
        let candles = make_candles(&[42.0; 10]);
        let series = calculate_ema(&candles, 4);
        assert_eq!(series.values.len(), 7);
        for value in &series.values {
            assert!((value - 42.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_period_one_is_identity() {
        let candles = make_candles(&[5.0, 6.0, 7.0]);
        let series = calculate_ema(&candles, 1);
        assert_eq!(series.values, vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn ema_insufficient_data() {
        let candles = make_candles(&[10.0, 11.0]);
        assert!(calculate_ema(&candles, 3).is_empty());
        assert!(calculate_ema(&candles, 0).is_empty());
    }

    #[test]
    fn ema_tracks_trend_faster_than_sma() {
        let mut closes_vec: Vec<f64> = vec![100.0; 10];
        closes_vec.extend((1..=10).map(|i| 100.0 + i as f64 * 5.0));
        let candles = make_candles(&closes_vec);

        let ema = calculate_ema(&candles, 5);
        let sma = super::super::sma::calculate_sma(&candles, 5);
        // During a sustained up-trend the EMA sits above the SMA.
        assert!(ema.latest().unwrap() > sma.latest().unwrap());
    }
}

//! Price momentum.

use std::collections::HashMap;

use crate::domain::candle::{closes, Candle};

use super::{IndicatorKind, IndicatorSeries, SignalLabel};

pub const DEFAULT_PERIOD: usize = 10;

/// Momentum[i] = close[i] - close[i - period]. Positive readings label
/// BUY, negative SELL, exactly zero HOLD.
pub fn calculate_momentum(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Momentum(period);
    let closes = closes(candles);
    if period == 0 || closes.len() < period + 1 {
        return IndicatorSeries::empty(kind);
    }

    let values: Vec<f64> = (period..closes.len())
        .map(|i| closes[i] - closes[i - period])
        .collect();
    let signals = values
        .iter()
        .map(|&m| {
            if m > 0.0 {
                SignalLabel::Buy
            } else if m < 0.0 {
                SignalLabel::Sell
            } else {
                SignalLabel::Hold
            }
        })
        .collect();

    IndicatorSeries {
        kind,
        offset: period,
        values,
        signals: Some(signals),
        metadata: HashMap::new(),
    }
}

//! Relative strength index with Wilder smoothing.

use std::collections::HashMap;

use crate::domain::candle::{closes, Candle};

use super::{IndicatorKind, IndicatorSeries, SignalLabel};

pub const DEFAULT_PERIOD: usize = 14;
pub const OVERSOLD: f64 = 30.0;
pub const OVERBOUGHT: f64 = 70.0;

/// RSI over closes. Average gain/loss are seeded with the simple mean of
/// the first `period` changes, then smoothed as
/// `avg = (avg * (period - 1) + current) / period`. A window with zero
/// average loss reads 100 rather than dividing by zero.
///
/// Attaches BUY below 30 and SELL above 70.
pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let kind = IndicatorKind::Rsi(period);
    let closes = closes(candles);
    if period == 0 || closes.len() < period + 1 {
        return IndicatorSeries::empty(kind);
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period]
        .iter()
        .map(|c| c.max(0.0))
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = changes[..period]
        .iter()
        .map(|c| (-c).max(0.0))
        .sum::<f64>()
        / period as f64;

    let mut values = Vec::with_capacity(closes.len() - period);
    let mut signals = Vec::with_capacity(closes.len() - period);

    fn push(avg_gain: f64, avg_loss: f64, values: &mut Vec<f64>, signals: &mut Vec<SignalLabel>) {
        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };
        values.push(rsi);
        signals.push(if rsi < OVERSOLD {
            SignalLabel::Buy
        } else if rsi > OVERBOUGHT {
            SignalLabel::Sell
        } else {
            SignalLabel::Hold
        });
    }

    push(avg_gain, avg_loss, &mut values, &mut signals);
    for &change in &changes[period..] {
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        push(avg_gain, avg_loss, &mut values, &mut signals);
    }

    IndicatorSeries {
        kind,
        offset: period,
        values,
        signals: Some(signals),
        metadata: HashMap::new(),
    }
}

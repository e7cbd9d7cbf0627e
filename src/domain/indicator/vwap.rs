//! Cumulative volume-weighted average price.

use std::collections::HashMap;

use crate::domain::candle::Candle;

use super::{IndicatorKind, IndicatorSeries};

/// VWAP[i] = sum(typical price * volume) / sum(volume) over candles
/// `[0, i]`. No warm-up; defined from the first candle. While cumulative
/// volume is still zero the typical price stands in for the ratio.
pub fn calculate_vwap(candles: &[Candle]) -> IndicatorSeries {
    if candles.is_empty() {
        return IndicatorSeries::empty(IndicatorKind::Vwap);
    }

    let mut cum_pv = 0.0;
    let mut cum_volume = 0.0;
    let values = candles
        .iter()
        .map(|candle| {
            let tp = candle.typical_price();
            cum_pv += tp * candle.volume;
            cum_volume += candle.volume;
            if cum_volume == 0.0 {
                tp
            } else {
                cum_pv / cum_volume
            }
        })
        .collect();

    IndicatorSeries {
        kind: IndicatorKind::Vwap,
        offset: 0,
        values,
        signals: None,
        metadata: HashMap::new(),
    }
}

//! Candle data boundary.

use crate::domain::candle::Candle;
use crate::domain::error::TradekitError;

/// Source of historical candles. The core never performs I/O itself;
/// implementations live in the adapters layer.
pub trait CandleSource {
    /// Candles for `symbol` within `[start_ms, end_ms]` (both bounds
    /// inclusive, `None` = unbounded), ascending by timestamp.
    fn fetch(
        &self,
        symbol: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<Candle>, TradekitError>;
}

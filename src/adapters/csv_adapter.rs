//! CSV file candle source.
//!
//! Expects one file per symbol under a base directory, named
//! `<SYMBOL>.csv` with a header row:
//! `timestamp,open,high,low,close,volume` (timestamp in UTC ms).

use std::fs;
use std::path::PathBuf;

use crate::domain::candle::Candle;
use crate::domain::error::TradekitError;
use crate::ports::data_port::CandleSource;

pub struct CsvCandleSource {
    base_path: PathBuf,
}

impl CsvCandleSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl CandleSource for CsvCandleSource {
    fn fetch(
        &self,
        symbol: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Vec<Candle>, TradekitError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| TradekitError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();
        for result in reader.deserialize::<Candle>() {
            let candle = result.map_err(|e| TradekitError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            if let Some(start) = start_ms {
                if candle.timestamp < start {
                    continue;
                }
            }
            if let Some(end) = end_ms {
                if candle.timestamp > end {
                    continue;
                }
            }
            candles.push(candle);
        }

        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

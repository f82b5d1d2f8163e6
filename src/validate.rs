//! Input validation for caller-supplied market data.
//!
//! The engine itself is total over whatever bars it is handed; callers that
//! want loud failures on malformed data run these checks up front.

use thiserror::Error;

use crate::domain::Bar;

#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("bar {index} has non-finite or inconsistent OHLC values")]
    InsaneBar { index: usize },

    #[error("bar {index} is not after the previous bar ({prev} >= {next})")]
    OutOfOrder {
        index: usize,
        prev: chrono::NaiveDateTime,
        next: chrono::NaiveDateTime,
    },

    #[error("bar {index} has negative volume {volume}")]
    NegativeVolume { index: usize, volume: f64 },
}

/// Check bars for OHLC sanity, strictly ascending times, and non-negative
/// volume. Returns the first problem found.
pub fn validate_bars(bars: &[Bar]) -> Result<(), DataError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(DataError::InsaneBar { index });
        }
        if bar.volume < 0.0 || !bar.volume.is_finite() {
            return Err(DataError::NegativeVolume {
                index,
                volume: bar.volume,
            });
        }
        if index > 0 {
            let prev = bars[index - 1].time;
            if prev >= bar.time {
                return Err(DataError::OutOfOrder {
                    index,
                    prev,
                    next: bar.time,
                });
            }
        }
    }
    Ok(())
}

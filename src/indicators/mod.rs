//! Indicator series used by entry filters and risk rules.
//!
//! All series are `Vec<f64>` aligned by bar index, with `f64::NAN` marking
//! the warm-up period. `precompute` computes only the series the resolved
//! settings require and caches them across repeated runs.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod precompute;
pub mod rsi;
pub mod sma;

pub use adx::adx;
pub use atr::{atr, true_range, wilder_smooth};
pub use ema::ema;
pub use precompute::IndicatorSet;
pub use rsi::rsi;
pub use sma::sma;

/// Create synthetic bars from close prices for testing.
///
/// open = prev close (or close for the first bar), high/low bracket them
/// by 1.0, constant volume.
#[cfg(test)]
pub(crate) fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                time: base + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Create synthetic bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub(crate) fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            time: base + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub(crate) const DEFAULT_EPSILON: f64 = 1e-10;

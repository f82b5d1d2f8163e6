//! Exponential Moving Average (EMA) over close prices.
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1],
//! alpha = 2 / (period + 1). Seed: SMA of the first `period` closes.

use crate::domain::Bar;

pub fn ema(bars: &[Bar], period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum = 0.0;
    for bar in &bars[..period] {
        if bar.close.is_nan() {
            return result;
        }
        sum += bar.close;
    }
    let mut prev = sum / period as f64;
    result[period - 1] = prev;

    let alpha = 2.0 / (period as f64 + 1.0);
    for i in period..n {
        if bars[i].close.is_nan() {
            return result;
        }
        prev = alpha * bars[i].close + (1.0 - alpha) * prev;
        result[i] = prev;
    }

    result
}

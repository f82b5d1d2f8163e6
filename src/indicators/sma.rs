//! Simple Moving Average over an arbitrary value series.
//!
//! Used for the volume filter (SMA of volume). Rolling window sum; first
//! defined value at index `period - 1`. A NaN inside the window leaves that
//! window's value undefined without poisoning later windows.

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().all(|v| !v.is_nan()) {
            result[i] = window.iter().sum::<f64>() / period as f64;
        }
    }

    result
}

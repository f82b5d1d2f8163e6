//! ADX — Average Directional Index (Wilder).
//!
//! 1. +DM / -DM from consecutive bars
//! 2. Wilder-smooth +DM, -DM, TR
//! 3. ±DI = 100 * smoothed(±DM) / smoothed(TR)
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX
//!
//! Warm-up: roughly 2 * period bars before the first defined value.

use crate::domain::Bar;
use crate::indicators::atr::{true_range, wilder_smooth};

pub fn adx(bars: &[Bar], period: usize) -> Vec<f64> {
    let n = bars.len();
    if n < 2 || period == 0 {
        return vec![f64::NAN; n];
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];
    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        if up.is_nan() || down.is_nan() {
            continue;
        }
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }

    let smooth_tr = wilder_smooth(&true_range(bars), period);
    let smooth_plus = wilder_smooth(&plus_dm, period);
    let smooth_minus = wilder_smooth(&minus_dm, period);

    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        if smooth_tr[i].is_nan()
            || smooth_plus[i].is_nan()
            || smooth_minus[i].is_nan()
            || smooth_tr[i] == 0.0
        {
            continue;
        }
        let plus_di = 100.0 * smooth_plus[i] / smooth_tr[i];
        let minus_di = 100.0 * smooth_minus[i] / smooth_tr[i];
        let di_sum = plus_di + minus_di;
        dx[i] = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };
    }

    wilder_smooth(&dx, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    #[test]
    fn adx_bounds() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
            (101.0, 106.0, 100.0, 105.0),
            (105.0, 110.0, 103.0, 108.0),
            (108.0, 112.0, 106.0, 110.0),
            (110.0, 111.0, 104.0, 105.0),
            (105.0, 109.0, 103.0, 107.0),
            (107.0, 113.0, 105.0, 112.0),
        ]);
        for (i, v) in adx(&bars, 3).iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(v), "ADX out of bounds at {i}: {v}");
            }
        }
    }

    #[test]
    fn adx_elevated_in_strong_trend() {
        let mut data = Vec::new();
        for i in 0..20 {
            let base = 100.0 + i as f64 * 5.0;
            data.push((base - 1.0, base + 3.0, base - 3.0, base + 2.0));
        }
        let bars = make_ohlc_bars(&data);
        let result = adx(&bars, 5);
        let last = result.iter().rev().find(|v| !v.is_nan()).copied().unwrap();
        assert!(last > 20.0, "strong one-way trend should push ADX up: {last}");
    }

    #[test]
    fn adx_too_few_bars() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0)]);
        assert!(adx(&bars, 3).iter().all(|v| v.is_nan()));
    }
}

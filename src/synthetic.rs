//! Seeded synthetic market data for tests and benchmarks.
//!
//! Everything here is deterministic in the seed: the same `(seed, n)` pair
//! always yields the same bars, regardless of platform or call order.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Bar, Signal, SignalKind};

fn session_start() -> NaiveDateTime {
    // Arbitrary fixed session open; only spacing matters.
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap_or_default()
}

/// Generate `n` minute bars as a geometric random walk around 100.
pub fn random_walk_bars(n: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = session_start();
    let mut close = 100.0;
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let open = close;
        let drift: f64 = rng.gen_range(-0.004..0.004);
        close = (open * (1.0 + drift)).max(1.0);
        let span = open * rng.gen_range(0.001..0.01);
        let high = open.max(close) + span;
        let low = (open.min(close) - span).max(0.5);
        let volume = rng.gen_range(5_000.0..50_000.0_f64).round();

        bars.push(Bar {
            time: start + Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume,
        });
    }
    bars
}

/// Alternate buy/sell signals at the close of every `every`-th bar.
///
/// Deterministic and purely positional, so two engine variants fed the same
/// bars see exactly the same raw signal list.
pub fn alternating_signals(bars: &[Bar], every: usize) -> Vec<Signal> {
    if every == 0 {
        return Vec::new();
    }
    bars.iter()
        .enumerate()
        .step_by(every)
        .map(|(i, bar)| {
            let kind = if (i / every) % 2 == 0 {
                SignalKind::Buy
            } else {
                SignalKind::Sell
            };
            let mut signal = Signal::new(bar.time, kind, bar.close);
            signal.bar_index = Some(i);
            signal
        })
        .collect()
}

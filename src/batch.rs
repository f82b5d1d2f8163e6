//! Batch execution: many parameter variants over one bar series, in parallel.
//!
//! Jobs run through the compact engine, so a large sweep costs one `Stats`
//! per variant rather than a full ledger. Each worker thread keeps its own
//! indicator cache; variants that share periods reuse the cached series.
//! Output order matches input order regardless of scheduling.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Signal};
use crate::engine::run_compact;
use crate::indicators::IndicatorSet;
use crate::settings::BacktestSettings;
use crate::stats::Stats;

/// One variant in a batch: its signals, settings, and starting capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub signals: Vec<Signal>,
    pub settings: BacktestSettings,
    pub initial_capital: f64,
}

/// Run every job against the same bars; results are positionally aligned
/// with `jobs`.
pub fn run_batch(bars: &[Bar], jobs: &[BatchJob]) -> Vec<Stats> {
    jobs.par_iter()
        .map_init(IndicatorSet::new, |cache, job| {
            run_compact(
                bars,
                &job.signals,
                &job.settings,
                job.initial_capital,
                Some(cache),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalKind;
    use crate::engine::run_backtest;
    use crate::indicators::make_ohlc_bars;

    fn sample_bars() -> Vec<Bar> {
        make_ohlc_bars(
            &(0..60)
                .map(|i| {
                    let base = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1;
                    (base, base + 2.0, base - 2.0, base + 0.5)
                })
                .collect::<Vec<_>>(),
        )
    }

    fn sample_jobs(bars: &[Bar]) -> Vec<BatchJob> {
        let signals = vec![
            Signal::new(bars[10].time, SignalKind::Buy, bars[10].close),
            Signal::new(bars[25].time, SignalKind::Sell, bars[25].close),
            Signal::new(bars[35].time, SignalKind::Buy, bars[35].close),
        ];
        [None, Some(1.5), Some(3.0)]
            .into_iter()
            .map(|stop| BatchJob {
                signals: signals.clone(),
                settings: BacktestSettings {
                    stop_loss_atr: stop,
                    ..Default::default()
                },
                initial_capital: 100_000.0,
            })
            .collect()
    }

    #[test]
    fn batch_matches_sequential_runs() {
        let bars = sample_bars();
        let jobs = sample_jobs(&bars);
        let batch = run_batch(&bars, &jobs);
        assert_eq!(batch.len(), jobs.len());
        for (job, stats) in jobs.iter().zip(&batch) {
            let solo = run_backtest(&bars, &job.signals, &job.settings, job.initial_capital, None);
            assert_eq!(*stats, solo.stats);
        }
    }

    #[test]
    fn batch_is_deterministic_across_calls() {
        let bars = sample_bars();
        let jobs = sample_jobs(&bars);
        assert_eq!(run_batch(&bars, &jobs), run_batch(&bars, &jobs));
    }

    #[test]
    fn empty_batch_is_empty() {
        let bars = sample_bars();
        assert!(run_batch(&bars, &[]).is_empty());
    }
}

//! Indicator precomputation with cross-run caching.
//!
//! Callers that run many simulations over the same data (parameter search,
//! scanning) hold one `IndicatorSet` and pass it by mutable reference;
//! `ensure` computes only what the resolved settings require and only what
//! is missing or stale. Recomputation is pure memoization: a cached series
//! is bit-identical to a fresh compute over the same inputs.

use crate::domain::Bar;
use crate::settings::NormalizedSettings;
use serde::Serialize;

use super::{adx, atr, ema, rsi, sma};

/// The (series, period) pairs a run needs, in canonical form.
///
/// Serialized to JSON (field order is fixed by the struct) and hashed with
/// blake3 to give a cheap staleness check for the whole set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
struct Requirements {
    data_len: usize,
    atr: Option<usize>,
    ema_trend: Option<usize>,
    adx: Option<usize>,
    volume_sma: Option<usize>,
    rsi: Option<usize>,
}

impl Requirements {
    fn resolve(settings: &NormalizedSettings, data_len: usize) -> Self {
        Self {
            data_len,
            atr: settings.needs_atr().then_some(settings.atr_period),
            ema_trend: settings
                .needs_trend_ema()
                .then_some(settings.trend_ema_period()),
            adx: settings.needs_adx().then_some(settings.adx_period()),
            volume_sma: settings.volume.map(|v| v.sma_period),
            rsi: settings.rsi.map(|r| r.period),
        }
    }

    fn fingerprint(&self) -> blake3::Hash {
        let json = serde_json::to_string(self).expect("Requirements must serialize");
        blake3::hash(json.as_bytes())
    }
}

/// One cached series plus the period it was computed with.
#[derive(Debug, Clone, Default)]
struct CachedSeries {
    period: usize,
    values: Vec<f64>,
}

/// Precomputed indicator series, reusable across many simulation calls.
///
/// `None` means "not computed"; `f64::NAN` inside a series means warm-up.
/// Callers must not mutate the arrays between runs.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    data_len: usize,
    fingerprint: Option<blake3::Hash>,
    atr: Option<CachedSeries>,
    ema_trend: Option<CachedSeries>,
    adx: Option<CachedSeries>,
    volume_sma: Option<CachedSeries>,
    rsi: Option<CachedSeries>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute whatever the settings require and is not already cached.
    ///
    /// A data-length change drops everything; a period change drops only the
    /// affected series.
    pub fn ensure(&mut self, bars: &[Bar], settings: &NormalizedSettings) {
        let req = Requirements::resolve(settings, bars.len());
        let fp = req.fingerprint();
        if self.fingerprint == Some(fp) {
            return;
        }

        if self.data_len != bars.len() {
            *self = Self::default();
            self.data_len = bars.len();
        }

        ensure_series(&mut self.atr, req.atr, |p| atr(bars, p));
        ensure_series(&mut self.ema_trend, req.ema_trend, |p| ema(bars, p));
        ensure_series(&mut self.adx, req.adx, |p| adx(bars, p));
        ensure_series(&mut self.volume_sma, req.volume_sma, |p| {
            let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
            sma(&volumes, p)
        });
        ensure_series(&mut self.rsi, req.rsi, |p| rsi(bars, p));

        self.fingerprint = Some(fp);
    }

    /// ATR at `index`; `None` when not computed or still warming up.
    pub fn atr_at(&self, index: usize) -> Option<f64> {
        series_at(&self.atr, index)
    }

    pub fn ema_trend_at(&self, index: usize) -> Option<f64> {
        series_at(&self.ema_trend, index)
    }

    pub fn adx_at(&self, index: usize) -> Option<f64> {
        series_at(&self.adx, index)
    }

    pub fn volume_sma_at(&self, index: usize) -> Option<f64> {
        series_at(&self.volume_sma, index)
    }

    pub fn rsi_at(&self, index: usize) -> Option<f64> {
        series_at(&self.rsi, index)
    }
}

fn ensure_series<F>(slot: &mut Option<CachedSeries>, wanted: Option<usize>, compute: F)
where
    F: FnOnce(usize) -> Vec<f64>,
{
    match wanted {
        None => {}
        Some(period) => {
            let stale = slot.as_ref().map(|c| c.period != period).unwrap_or(true);
            if stale {
                *slot = Some(CachedSeries {
                    period,
                    values: compute(period),
                });
            }
        }
    }
}

fn series_at(slot: &Option<CachedSeries>, index: usize) -> Option<f64> {
    slot.as_ref()
        .and_then(|c| c.values.get(index))
        .copied()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;
    use crate::settings::BacktestSettings;

    fn trending_bars(n: usize) -> Vec<crate::domain::Bar> {
        let data: Vec<(f64, f64, f64, f64)> = (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                (base, base + 2.0, base - 2.0, base + 1.0)
            })
            .collect();
        make_ohlc_bars(&data)
    }

    #[test]
    fn computes_only_required_series() {
        let bars = trending_bars(40);
        let settings = BacktestSettings {
            stop_loss_atr: Some(2.0),
            ..Default::default()
        }
        .normalize();

        let mut set = IndicatorSet::new();
        set.ensure(&bars, &settings);
        assert!(set.atr.is_some());
        assert!(set.ema_trend.is_none());
        assert!(set.rsi.is_none());
    }

    #[test]
    fn warm_up_reads_none() {
        let bars = trending_bars(40);
        let settings = BacktestSettings {
            stop_loss_atr: Some(2.0),
            atr_period: Some(14),
            ..Default::default()
        }
        .normalize();

        let mut set = IndicatorSet::new();
        set.ensure(&bars, &settings);
        assert_eq!(set.atr_at(0), None);
        assert!(set.atr_at(20).is_some());
        assert_eq!(set.atr_at(999), None);
    }

    #[test]
    fn length_change_drops_everything() {
        let settings = BacktestSettings {
            stop_loss_atr: Some(2.0),
            ..Default::default()
        }
        .normalize();

        let mut set = IndicatorSet::new();
        set.ensure(&trending_bars(40), &settings);
        let before = set.atr.as_ref().unwrap().values.len();
        assert_eq!(before, 40);

        set.ensure(&trending_bars(50), &settings);
        assert_eq!(set.atr.as_ref().unwrap().values.len(), 50);
    }

    #[test]
    fn period_change_recomputes_only_that_series() {
        let bars = trending_bars(60);
        let both = BacktestSettings {
            stop_loss_atr: Some(2.0),
            rsi_period: Some(14),
            ..Default::default()
        };
        let mut set = IndicatorSet::new();
        set.ensure(&bars, &both.normalize());
        let rsi_before = set.rsi.as_ref().unwrap().values.clone();

        let atr_changed = BacktestSettings {
            atr_period: Some(7),
            ..both.clone()
        };
        set.ensure(&bars, &atr_changed.normalize());
        assert_eq!(set.atr.as_ref().unwrap().period, 7);
        assert_eq!(set.rsi.as_ref().unwrap().values, rsi_before);
    }

    #[test]
    fn cached_equals_fresh() {
        let bars = trending_bars(60);
        let settings = BacktestSettings {
            stop_loss_atr: Some(2.0),
            trend_ema_period: Some(10),
            ..Default::default()
        }
        .normalize();

        let mut warm = IndicatorSet::new();
        warm.ensure(&bars, &settings);
        warm.ensure(&bars, &settings); // second call is a no-op

        let mut fresh = IndicatorSet::new();
        fresh.ensure(&bars, &settings);

        for i in 0..bars.len() {
            assert_eq!(warm.atr_at(i), fresh.atr_at(i));
            assert_eq!(warm.ema_trend_at(i), fresh.ema_trend_at(i));
        }
    }
}

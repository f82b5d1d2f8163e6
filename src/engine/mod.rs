//! The simulation engine: signal preparation, position lifecycle, books.
//!
//! Pipeline per run: normalize settings → ensure indicator series → prepare
//! signals → replay bars through the lifecycle loop → aggregate. The full
//! variant keeps the trade ledger and equity curve; the compact variant
//! folds the same events into accumulators and returns only statistics.

mod book;
mod combined;
mod compact;
mod entry;
mod prepare;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, EquityPoint, Signal, Trade};
use crate::indicators::IndicatorSet;
use crate::settings::{BacktestSettings, TradeDirection};
use crate::stats::{DrawdownTracker, Stats, TradeTally};

use book::{run_book, BookSink};
use compact::CompactSink;
use prepare::prepare_signals;

pub use prepare::classify_market_mode;

/// Everything a full run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub stats: Stats,
}

impl BacktestResult {
    fn empty() -> Self {
        Self {
            trades: Vec::new(),
            equity_curve: Vec::new(),
            stats: Stats::zero(),
        }
    }
}

/// Full-ledger sink: stores every trade and equity point, and feeds the
/// statistics accumulators as it goes.
#[derive(Debug, Default)]
pub(crate) struct FullSink {
    trades: Vec<Trade>,
    equity: Vec<EquityPoint>,
    tally: TradeTally,
    drawdown: DrawdownTracker,
}

impl FullSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_parts(self) -> (Vec<EquityPoint>, Vec<Trade>) {
        (self.equity, self.trades)
    }

    fn into_result(self, initial_capital: f64) -> BacktestResult {
        BacktestResult {
            stats: Stats::from_parts(&self.tally, &self.drawdown, initial_capital),
            trades: self.trades,
            equity_curve: self.equity,
        }
    }
}

impl BookSink for FullSink {
    fn on_trade(&mut self, trade: Trade) {
        self.tally.add(&trade);
        self.trades.push(trade);
    }

    fn on_equity(&mut self, time: NaiveDateTime, value: f64) {
        self.drawdown.observe(value);
        self.equity.push(EquityPoint { time, value });
    }
}

/// Run a full backtest: trade ledger, per-bar equity curve, statistics.
///
/// Pass a cached `IndicatorSet` to reuse indicator series across runs over
/// the same bars (parameter sweeps); pass `None` for a one-off run.
pub fn run_backtest(
    bars: &[Bar],
    signals: &[Signal],
    settings: &BacktestSettings,
    initial_capital: f64,
    cache: Option<&mut IndicatorSet>,
) -> BacktestResult {
    let norm = settings.normalize();
    if bars.is_empty() {
        return BacktestResult::empty();
    }

    let mut local = IndicatorSet::new();
    let indicators = cache.unwrap_or(&mut local);

    if norm.trade_direction == TradeDirection::Combined {
        return combined::run_combined(bars, signals, &norm, initial_capital, indicators);
    }

    indicators.ensure(bars, &norm);
    let prepared = prepare_signals(bars, signals, &norm, indicators, None);
    let mut sink = FullSink::new();
    run_book(bars, &prepared, &norm, indicators, initial_capital, &mut sink);
    sink.into_result(initial_capital)
}

/// Run a backtest keeping only running aggregates; returns statistics equal
/// to `run_backtest(..).stats` on the same inputs.
pub fn run_compact(
    bars: &[Bar],
    signals: &[Signal],
    settings: &BacktestSettings,
    initial_capital: f64,
    cache: Option<&mut IndicatorSet>,
) -> Stats {
    let norm = settings.normalize();
    if bars.is_empty() {
        return Stats::zero();
    }

    let mut local = IndicatorSet::new();
    let indicators = cache.unwrap_or(&mut local);

    if norm.trade_direction == TradeDirection::Combined {
        // Combined statistics are defined over the merged series, so the
        // ledgers must exist before they can be merged.
        return combined::run_combined(bars, signals, &norm, initial_capital, indicators).stats;
    }

    indicators.ensure(bars, &norm);
    let prepared = prepare_signals(bars, signals, &norm, indicators, None);
    let mut sink = CompactSink::new();
    run_book(bars, &prepared, &norm, indicators, initial_capital, &mut sink);
    sink.into_stats(initial_capital)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalKind;
    use crate::indicators::make_ohlc_bars;

    #[test]
    fn empty_bars_give_empty_result() {
        let result = run_backtest(&[], &[], &BacktestSettings::default(), 100_000.0, None);
        assert!(result.trades.is_empty());
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.stats, Stats::zero());
    }

    #[test]
    fn compact_matches_full_stats() {
        let bars = make_ohlc_bars(&[
            (100.0, 101.0, 99.0, 100.0),
            (100.0, 102.0, 99.0, 101.0),
            (101.0, 104.0, 100.0, 103.0),
            (103.0, 105.0, 102.0, 104.0),
            (104.0, 104.0, 101.0, 102.0),
        ]);
        let signals = vec![
            Signal::new(bars[1].time, SignalKind::Buy, 101.0),
            Signal::new(bars[3].time, SignalKind::Sell, 104.0),
        ];
        let settings = BacktestSettings::default();

        let full = run_backtest(&bars, &signals, &settings, 100_000.0, None);
        let compact = run_compact(&bars, &signals, &settings, 100_000.0, None);
        assert_eq!(full.stats, compact);
        assert_eq!(full.trades.len(), 1);
        assert_eq!(full.equity_curve.len(), bars.len());
    }

    #[test]
    fn cache_reuse_changes_nothing() {
        let bars = make_ohlc_bars(&vec![(100.0, 105.0, 95.0, 100.0); 30]);
        let signals = vec![Signal::new(bars[5].time, SignalKind::Buy, 100.0)];
        let settings = BacktestSettings {
            atr_period: Some(5),
            stop_loss_atr: Some(1.0),
            ..Default::default()
        };

        let mut cache = IndicatorSet::new();
        let warm1 = run_backtest(&bars, &signals, &settings, 100_000.0, Some(&mut cache));
        let warm2 = run_backtest(&bars, &signals, &settings, 100_000.0, Some(&mut cache));
        let cold = run_backtest(&bars, &signals, &settings, 100_000.0, None);
        assert_eq!(warm1, warm2);
        assert_eq!(warm1, cold);
    }
}

//! Combined direction: independent long-only and short-only books over the
//! same data, each funded with half the capital.
//!
//! Capital is split at cent precision so the halves sum exactly to the
//! whole (the odd cent goes to the short book). Timestamps carrying both a
//! buy and a sell signal are ambiguous for direction selection: entries at
//! those times are dropped from both books, exits still apply. The merged
//! statistics are recomputed from the merged trade list and the summed
//! equity curve, not by averaging per-book statistics.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::domain::{Bar, EquityPoint, Signal, SignalKind, Trade};
use crate::indicators::IndicatorSet;
use crate::settings::{NormalizedSettings, TradeDirection};
use crate::stats::{DrawdownTracker, Stats, TradeTally};

use super::book::run_book;
use super::prepare::prepare_signals;
use super::{BacktestResult, FullSink};

/// Split capital into (long, short) halves at cent precision.
///
/// The halves always sum to the input rounded to cents; the short book
/// receives the odd cent.
pub fn split_capital(initial_capital: f64) -> (f64, f64) {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return (0.0, 0.0);
    }
    let cents = (initial_capital * 100.0).round() as i64;
    let long_cents = cents / 2;
    let short_cents = cents - long_cents;
    (long_cents as f64 / 100.0, short_cents as f64 / 100.0)
}

/// Signal times that carry both a buy and a sell.
pub fn conflict_times(signals: &[Signal]) -> HashSet<NaiveDateTime> {
    let mut buys = HashSet::new();
    let mut sells = HashSet::new();
    for signal in signals {
        match signal.kind {
            SignalKind::Buy => buys.insert(signal.time),
            SignalKind::Sell => sells.insert(signal.time),
        };
    }
    buys.intersection(&sells).copied().collect()
}

pub fn run_combined(
    bars: &[Bar],
    signals: &[Signal],
    settings: &NormalizedSettings,
    initial_capital: f64,
    indicators: &mut IndicatorSet,
) -> BacktestResult {
    indicators.ensure(bars, settings);

    let (long_capital, short_capital) = split_capital(initial_capital);
    let blocked = conflict_times(signals);

    let long_result = run_side(
        bars,
        signals,
        settings,
        TradeDirection::Long,
        long_capital,
        indicators,
        &blocked,
    );
    let short_result = run_side(
        bars,
        signals,
        settings,
        TradeDirection::Short,
        short_capital,
        indicators,
        &blocked,
    );

    merge(long_result, short_result, initial_capital)
}

fn run_side(
    bars: &[Bar],
    signals: &[Signal],
    settings: &NormalizedSettings,
    direction: TradeDirection,
    capital: f64,
    indicators: &IndicatorSet,
    blocked: &HashSet<NaiveDateTime>,
) -> FullSink {
    let side = NormalizedSettings {
        trade_direction: direction,
        ..settings.clone()
    };
    let prepared = prepare_signals(bars, signals, &side, indicators, Some(blocked));
    let mut sink = FullSink::new();
    run_book(bars, &prepared, &side, indicators, capital, &mut sink);
    sink
}

fn merge(long: FullSink, short: FullSink, initial_capital: f64) -> BacktestResult {
    // Both books ran over the same bars, so the curves are index-aligned.
    let (long_equity, long_trades) = long.into_parts();
    let (short_equity, short_trades) = short.into_parts();

    let equity_curve: Vec<EquityPoint> = long_equity
        .iter()
        .zip(short_equity.iter())
        .map(|(l, s)| EquityPoint {
            time: l.time,
            value: l.value + s.value,
        })
        .collect();

    let mut trades: Vec<Trade> = long_trades;
    trades.extend(short_trades);
    trades.sort_by(|a, b| (a.exit_time, a.entry_time).cmp(&(b.exit_time, b.entry_time)));
    for (i, trade) in trades.iter_mut().enumerate() {
        trade.id = i + 1;
    }

    let mut tally = TradeTally::new();
    for trade in &trades {
        tally.add(trade);
    }
    let mut drawdown = DrawdownTracker::new();
    for point in &equity_curve {
        drawdown.observe(point.value);
    }

    BacktestResult {
        stats: Stats::from_parts(&tally, &drawdown, initial_capital),
        trades,
        equity_curve,
    }
}

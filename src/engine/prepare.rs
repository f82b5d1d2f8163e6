//! Signal preparation: raw strategy signals → executable, filtered events.
//!
//! Each raw signal is resolved to the bar and price it would actually fill
//! at under the configured execution model, entry filters and regime gates
//! are applied (exits bypass all filters), and the survivors are stably
//! sorted by `(execution time, original order)` so same-bar collisions
//! resolve deterministically.

use chrono::NaiveDateTime;
use std::collections::HashSet;

use crate::domain::{Bar, Signal, SignalKind};
use crate::indicators::IndicatorSet;
use crate::settings::{ExecutionModel, MarketMode, NormalizedSettings, TradeDirection};

/// How far past the signal bar the close-confirmation scan looks.
const CONFIRM_WINDOW: usize = 3;

/// A signal resolved to its actual execution bar and fill price.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSignal {
    /// Index of the bar the fill happens on.
    pub exec_index: usize,
    /// Time of the execution bar.
    pub time: NaiveDateTime,
    pub kind: SignalKind,
    /// Raw fill price before slippage adjustment.
    pub price: f64,
    /// Original position in the raw signal list (stable tie-break).
    pub seq: usize,
    /// Whether this signal may open a position. A signal that fails an
    /// entry filter keeps any exit role it has (exits bypass all filters)
    /// but must not enter.
    pub entry_allowed: bool,
}

/// Prepare raw signals for one book.
///
/// `blocked_entry_times` carries the combined-book conflict set: entries at
/// those signal times are dropped while exits pass through.
pub fn prepare_signals(
    bars: &[Bar],
    signals: &[Signal],
    settings: &NormalizedSettings,
    indicators: &IndicatorSet,
    blocked_entry_times: Option<&HashSet<NaiveDateTime>>,
) -> Vec<PreparedSignal> {
    let mut prepared = Vec::with_capacity(signals.len());

    for (seq, signal) in signals.iter().enumerate() {
        let Some(signal_index) = resolve_bar_index(bars, signal) else {
            continue;
        };
        if !signal.price.is_finite() || signal.price <= 0.0 {
            continue;
        }

        let exit_capable = is_exit(signal.kind, settings.trade_direction);
        let mut entry_allowed = is_entry(signal.kind, settings.trade_direction);

        if entry_allowed {
            let blocked = blocked_entry_times.is_some_and(|b| b.contains(&signal.time));
            if blocked
                || !passes_entry_filters(bars, signal_index, signal.kind, settings, indicators)
            {
                entry_allowed = false;
            }
        }
        // A signal with neither role left is gone; a filtered-out entry that
        // can still act as an exit stays queued as exit-only.
        if !entry_allowed && !exit_capable {
            continue;
        }

        // Close-confirmation advances the execution bar for entries. An
        // unconfirmed signal loses its entry role but keeps any exit role.
        let base_index = if entry_allowed && settings.confirm_close {
            match confirm_index(bars, signal_index, signal.kind, signal.price) {
                Some(idx) => idx,
                None if exit_capable => {
                    entry_allowed = false;
                    signal_index
                }
                None => continue,
            }
        } else {
            signal_index
        };

        let shift = match settings.execution_model {
            ExecutionModel::SignalClose => 0,
            ExecutionModel::NextOpen | ExecutionModel::NextClose => 1,
        };
        let exec_index = base_index + shift;
        if exec_index >= bars.len() {
            continue;
        }

        let price = if exec_index == signal_index {
            signal.price
        } else {
            match settings.execution_model {
                ExecutionModel::NextOpen => bars[exec_index].open,
                // SignalClose lands here only via close-confirmation.
                ExecutionModel::SignalClose | ExecutionModel::NextClose => bars[exec_index].close,
            }
        };
        if !price.is_finite() || price <= 0.0 {
            continue;
        }

        prepared.push(PreparedSignal {
            exec_index,
            time: bars[exec_index].time,
            kind: signal.kind,
            price,
            seq,
            entry_allowed,
        });
    }

    // Stable: equal execution times keep original signal order.
    prepared.sort_by(|a, b| (a.time, a.seq).cmp(&(b.time, b.seq)));
    prepared
}

/// Whether this signal kind opens a position under the direction policy.
fn is_entry(kind: SignalKind, direction: TradeDirection) -> bool {
    match direction {
        TradeDirection::Long => kind == SignalKind::Buy,
        TradeDirection::Short => kind == SignalKind::Sell,
        TradeDirection::Both | TradeDirection::Combined => true,
    }
}

/// Whether this signal kind can close the book's position.
fn is_exit(kind: SignalKind, direction: TradeDirection) -> bool {
    match direction {
        TradeDirection::Long => kind == SignalKind::Sell,
        TradeDirection::Short => kind == SignalKind::Buy,
        TradeDirection::Both | TradeDirection::Combined => true,
    }
}

fn resolve_bar_index(bars: &[Bar], signal: &Signal) -> Option<usize> {
    if let Some(idx) = signal.bar_index {
        return (idx < bars.len()).then_some(idx);
    }
    bars.binary_search_by(|bar| bar.time.cmp(&signal.time)).ok()
}

/// First bar after the signal whose close confirms the move, within the
/// confirmation window.
fn confirm_index(bars: &[Bar], signal_index: usize, kind: SignalKind, price: f64) -> Option<usize> {
    let end = (signal_index + CONFIRM_WINDOW).min(bars.len() - 1);
    (signal_index + 1..=end).find(|&j| match kind {
        SignalKind::Buy => bars[j].close > price,
        SignalKind::Sell => bars[j].close < price,
    })
}

fn passes_entry_filters(
    bars: &[Bar],
    index: usize,
    kind: SignalKind,
    settings: &NormalizedSettings,
    indicators: &IndicatorSet,
) -> bool {
    let bar = &bars[index];

    if settings.trend.is_some() {
        let Some(ema) = indicators.ema_trend_at(index) else {
            return false;
        };
        // First defined EMA value has no slope yet; treat it as flat.
        let prev = index
            .checked_sub(1)
            .and_then(|i| indicators.ema_trend_at(i))
            .unwrap_or(ema);
        let ok = match kind {
            SignalKind::Buy => bar.close > ema && ema >= prev,
            SignalKind::Sell => bar.close < ema && ema <= prev,
        };
        if !ok {
            return false;
        }
    }

    if let Some(volume) = settings.volume {
        let Some(vol_sma) = indicators.volume_sma_at(index) else {
            return false;
        };
        if bar.volume < volume.multiple * vol_sma {
            return false;
        }
    }

    if let Some(rsi) = settings.rsi {
        let Some(value) = indicators.rsi_at(index) else {
            return false;
        };
        let ok = match kind {
            SignalKind::Buy => value >= rsi.bullish,
            SignalKind::Sell => value <= rsi.bearish,
        };
        if !ok {
            return false;
        }
    }

    if let Some(adx) = settings.adx {
        let Some(value) = indicators.adx_at(index) else {
            return false;
        };
        if value < adx.minimum {
            return false;
        }
    }

    if let Some(breakout) = settings.breakout {
        if index < breakout.lookback {
            return false;
        }
        let window = &bars[index - breakout.lookback..index];
        let ok = match kind {
            SignalKind::Buy => {
                let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
                bar.close > highest
            }
            SignalKind::Sell => {
                let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
                bar.close < lowest
            }
        };
        if !ok {
            return false;
        }
    }

    // ── Regime gates ──

    if let Some((lo, hi)) = settings.atr_pct_band {
        let Some(atr) = indicators.atr_at(index) else {
            return false;
        };
        if bar.close <= 0.0 {
            return false;
        }
        let atr_pct = atr / bar.close * 100.0;
        if atr_pct < lo || atr_pct > hi {
            return false;
        }
    }

    if let Some((lo, hi)) = settings.adx_band {
        let Some(value) = indicators.adx_at(index) else {
            return false;
        };
        if value < lo || value > hi {
            return false;
        }
    }

    if let Some(required) = settings.market_mode {
        let Some(mode) = classify_market_mode(bars, index, indicators) else {
            return false;
        };
        if mode != required {
            return false;
        }
    }

    true
}

/// Market regime at a bar: close above a rising trend EMA is `Trend`, below
/// a falling one is `Downtrend`, anything else is `Sideways`.
pub fn classify_market_mode(
    bars: &[Bar],
    index: usize,
    indicators: &IndicatorSet,
) -> Option<MarketMode> {
    let ema = indicators.ema_trend_at(index)?;
    let prev = indicators.ema_trend_at(index.checked_sub(1)?)?;
    let close = bars[index].close;
    Some(if close > ema && ema > prev {
        MarketMode::Trend
    } else if close < ema && ema < prev {
        MarketMode::Downtrend
    } else {
        MarketMode::Sideways
    })
}

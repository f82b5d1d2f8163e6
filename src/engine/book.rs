//! Position lifecycle state machine: the per-bar simulation loop for one book.
//!
//! Each bar, in fixed order:
//! 1. exits in priority order: stop-loss → take-profit → partial → time-stop
//!    (stop-loss wins when a bar touches both stop and target)
//! 2. trailing state: extreme-price ratchet, break-even, ATR trail
//! 3. drain prepared signals scheduled for this bar (entries / signal exits)
//! 4. record equity = cash + unrealized pnl
//!
//! At end of data any open position is force-closed at the final close.
//!
//! The loop is written once and emits through `BookSink`, so the full
//! (ledger-keeping) and compact (sums-only) variants cannot drift apart.

use chrono::NaiveDateTime;

use crate::domain::{Bar, BookState, Direction, ExitReason, PositionState, Trade};
use crate::indicators::IndicatorSet;
use crate::settings::{NormalizedSettings, TradeDirection};

use super::entry::{build_position, exit_fill};
use super::prepare::PreparedSignal;

/// Receiver for the loop's outputs. The full engine stores everything; the
/// compact engine folds each event into running accumulators.
pub trait BookSink {
    fn on_trade(&mut self, trade: Trade);
    fn on_equity(&mut self, time: NaiveDateTime, value: f64);
}

/// Run one book over the bars. Returns final cash (== initial + Σ pnl).
pub fn run_book<S: BookSink>(
    bars: &[Bar],
    prepared: &[PreparedSignal],
    settings: &NormalizedSettings,
    indicators: &IndicatorSet,
    initial_capital: f64,
    sink: &mut S,
) -> f64 {
    let mut cash = if initial_capital.is_finite() && initial_capital > 0.0 {
        initial_capital
    } else {
        0.0
    };
    let mut state = BookState::Flat;
    let mut next_trade_id = 1usize;
    let mut queue = prepared.iter().peekable();

    for (i, bar) in bars.iter().enumerate() {
        // ── 1. exits ──
        if let BookState::Open(pos) = &mut state {
            pos.bars_in_trade += 1;

            if let Some(exit) = check_rule_exits(pos, bar, settings) {
                match exit {
                    RuleExit::Full(price, reason) => {
                        let trade = close_portion(
                            pos,
                            pos.size,
                            price,
                            bar.time,
                            reason,
                            settings.commission_pct,
                            next_trade_id,
                        );
                        next_trade_id += 1;
                        cash += trade.pnl;
                        sink.on_trade(trade);
                        state = BookState::Flat;
                    }
                    RuleExit::Partial(price) => {
                        let qty = pos.size * settings.partial_fraction;
                        let trade = close_portion(
                            pos,
                            qty,
                            price,
                            bar.time,
                            ExitReason::Partial,
                            settings.commission_pct,
                            next_trade_id,
                        );
                        next_trade_id += 1;
                        cash += trade.pnl;
                        sink.on_trade(trade);
                        pos.size -= qty;
                        pos.partial_taken = true;
                        if pos.size <= 0.0 {
                            state = BookState::Flat;
                        }
                    }
                }
            }
        }

        // ── 2. trailing state ──
        if let BookState::Open(pos) = &mut state {
            update_trailing(pos, bar, settings, indicators.atr_at(i));
        }

        // ── 3. signal drain ──
        while let Some(&event) = queue.peek() {
            if event.exec_index > i {
                break;
            }
            queue.next();
            if event.exec_index < i {
                continue; // already passed (possible only with duplicate times)
            }

            match &mut state {
                BookState::Flat => {
                    if event.entry_allowed {
                        if let Some(pos) = build_position(
                            bars,
                            i,
                            event.kind,
                            event.price,
                            cash,
                            settings,
                            indicators,
                        ) {
                            state = BookState::Open(pos);
                        }
                    }
                }
                BookState::Open(pos) => {
                    let opposite = event.kind.entry_direction() == pos.direction.opposite();
                    if !opposite {
                        continue; // already positioned this way
                    }
                    if !settings.allow_same_bar_exit && pos.entry_index == i {
                        continue;
                    }
                    let price = exit_fill(pos.direction, event.price, settings.slippage_bps);
                    let trade = close_portion(
                        pos,
                        pos.size,
                        price,
                        bar.time,
                        ExitReason::Signal,
                        settings.commission_pct,
                        next_trade_id,
                    );
                    next_trade_id += 1;
                    cash += trade.pnl;
                    sink.on_trade(trade);
                    state = BookState::Flat;

                    // Under `both`, the same signal flips into a new position,
                    // provided it qualified as an entry in its own right.
                    if settings.trade_direction == TradeDirection::Both && event.entry_allowed {
                        if let Some(pos) = build_position(
                            bars,
                            i,
                            event.kind,
                            event.price,
                            cash,
                            settings,
                            indicators,
                        ) {
                            state = BookState::Open(pos);
                        }
                    }
                }
            }
        }

        // ── 4. equity ──
        let unrealized = state
            .as_open()
            .map(|pos| pos.unrealized_pnl(bar.close))
            .unwrap_or(0.0);
        sink.on_equity(bar.time, cash + unrealized);
    }

    // End of data: force-close at the final bar's close (mark, no slippage).
    if let BookState::Open(pos) = &mut state {
        if let Some(last) = bars.last() {
            let trade = close_portion(
                pos,
                pos.size,
                last.close,
                last.time,
                ExitReason::EndOfData,
                settings.commission_pct,
                next_trade_id,
            );
            cash += trade.pnl;
            sink.on_trade(trade);
        }
    }

    cash
}

enum RuleExit {
    Full(f64, ExitReason),
    Partial(f64),
}

/// Check non-signal exits in priority order against the bar's range.
fn check_rule_exits(
    pos: &PositionState,
    bar: &Bar,
    settings: &NormalizedSettings,
) -> Option<RuleExit> {
    let slip = settings.slippage_bps;

    // Stop-loss first: when a bar touches both stop and target, the stop
    // wins (conservative fill assumption).
    if let Some(stop) = pos.stop_loss {
        if touched_against(pos.direction, bar, stop) {
            return Some(RuleExit::Full(
                exit_fill(pos.direction, stop, slip),
                ExitReason::StopLoss,
            ));
        }
    }

    if let Some(target) = pos.take_profit {
        if touched_in_favor(pos.direction, bar, target) {
            return Some(RuleExit::Full(
                exit_fill(pos.direction, target, slip),
                ExitReason::TakeProfit,
            ));
        }
    }

    if !pos.partial_taken {
        if let Some(target) = pos.partial_target {
            if touched_in_favor(pos.direction, bar, target) {
                return Some(RuleExit::Partial(exit_fill(pos.direction, target, slip)));
            }
        }
    }

    if let Some(max_bars) = settings.time_stop_bars {
        let favorable = pos.direction.sign() * (bar.close - pos.entry_price);
        if pos.bars_in_trade >= max_bars && favorable <= 0.0 {
            return Some(RuleExit::Full(
                exit_fill(pos.direction, bar.close, slip),
                ExitReason::TimeStop,
            ));
        }
    }

    None
}

/// Did the bar touch a level on the adverse side (stop territory)?
fn touched_against(direction: Direction, bar: &Bar, level: f64) -> bool {
    match direction {
        Direction::Long => bar.low <= level,
        Direction::Short => bar.high >= level,
    }
}

/// Did the bar touch a level on the favorable side (target territory)?
fn touched_in_favor(direction: Direction, bar: &Bar, level: f64) -> bool {
    match direction {
        Direction::Long => bar.high >= level,
        Direction::Short => bar.low <= level,
    }
}

/// Ratchet the extreme price, then tighten the stop via break-even and the
/// ATR trail. Stops only ever tighten.
fn update_trailing(
    pos: &mut PositionState,
    bar: &Bar,
    settings: &NormalizedSettings,
    atr: Option<f64>,
) {
    match pos.direction {
        Direction::Long => {
            if bar.high > pos.extreme_price {
                pos.extreme_price = bar.high;
            }
        }
        Direction::Short => {
            if bar.low < pos.extreme_price {
                pos.extreme_price = bar.low;
            }
        }
    }

    let dir = pos.direction.sign();

    if !pos.break_even_applied {
        if let Some(r) = settings.break_even_r {
            let favorable = dir * (pos.extreme_price - pos.entry_price);
            if pos.risk_per_share > 0.0 && favorable >= r * pos.risk_per_share {
                tighten_stop(pos, pos.entry_price);
                pos.break_even_applied = true;
            }
        }
    }

    if let Some(multiple) = settings.trailing_atr {
        if let Some(atr) = atr {
            tighten_stop(pos, pos.extreme_price - dir * multiple * atr);
        }
    }
}

fn tighten_stop(pos: &mut PositionState, candidate: f64) {
    pos.stop_loss = Some(match (pos.stop_loss, pos.direction) {
        (None, _) => candidate,
        (Some(stop), Direction::Long) => stop.max(candidate),
        (Some(stop), Direction::Short) => stop.min(candidate),
    });
}

/// Realize a (full or partial) exit of `qty` shares at `price`.
///
/// Fees fold in the pro-rata entry commission and the exit commission;
/// `pnl_percent` is relative to the entry cost basis of the closed quantity.
fn close_portion(
    pos: &PositionState,
    qty: f64,
    price: f64,
    time: NaiveDateTime,
    reason: ExitReason,
    commission_pct: f64,
    id: usize,
) -> Trade {
    let exit_commission = price * commission_pct / 100.0 * qty;
    let fees = pos.entry_commission_per_share * qty + exit_commission;
    let pnl = pos.direction.sign() * (price - pos.entry_price) * qty - fees;
    let basis = pos.entry_price * qty;
    Trade {
        id,
        direction: pos.direction,
        entry_time: pos.entry_time,
        entry_price: pos.entry_price,
        exit_time: time,
        exit_price: price,
        size: qty,
        pnl,
        pnl_percent: if basis > 0.0 { pnl / basis * 100.0 } else { 0.0 },
        fees,
        exit_reason: reason,
    }
}

//! Position builder: turn an accepted entry signal into an open position.
//!
//! All rejection conditions are silent — a `None` here means the entry is
//! skipped and the simulation proceeds (warm-up ATR, non-positive capital,
//! degenerate share count).

use crate::domain::{Bar, Direction, PositionState, SignalKind};
use crate::indicators::IndicatorSet;
use crate::settings::{NormalizedSettings, RiskMode};

/// Fallback risk-per-share when neither a stop distance nor ATR exists.
const FALLBACK_RISK_FRACTION: f64 = 0.01;

/// Slippage-adjusted fill price for a buy-side fill (price moves against
/// the buyer).
pub fn buy_fill(price: f64, slippage_bps: f64) -> f64 {
    price * (1.0 + slippage_bps / 10_000.0)
}

/// Slippage-adjusted fill price for a sell-side fill.
pub fn sell_fill(price: f64, slippage_bps: f64) -> f64 {
    price * (1.0 - slippage_bps / 10_000.0)
}

/// Entry fill for a direction: longs buy in, shorts sell in.
pub fn entry_fill(direction: Direction, price: f64, slippage_bps: f64) -> f64 {
    match direction {
        Direction::Long => buy_fill(price, slippage_bps),
        Direction::Short => sell_fill(price, slippage_bps),
    }
}

/// Exit fill for a direction: longs sell out, shorts buy out.
pub fn exit_fill(direction: Direction, price: f64, slippage_bps: f64) -> f64 {
    match direction {
        Direction::Long => sell_fill(price, slippage_bps),
        Direction::Short => buy_fill(price, slippage_bps),
    }
}

/// Build a position from an accepted entry signal, or reject it silently.
pub fn build_position(
    bars: &[Bar],
    exec_index: usize,
    kind: SignalKind,
    raw_price: f64,
    cash: f64,
    settings: &NormalizedSettings,
    indicators: &IndicatorSet,
) -> Option<PositionState> {
    let direction = kind.entry_direction();
    let dir = direction.sign();

    let allocated = match settings.fixed_trade_amount {
        Some(amount) => amount.min(cash),
        None => cash * settings.position_size_pct / 100.0,
    };
    if !allocated.is_finite() || allocated <= 0.0 {
        return None;
    }

    let fill = entry_fill(direction, raw_price, settings.slippage_bps);
    if !fill.is_finite() || fill <= 0.0 {
        return None;
    }

    let commission_rate = settings.commission_pct / 100.0;
    let size = allocated / (fill * (1.0 + commission_rate));
    if !size.is_finite() || size <= 0.0 {
        return None;
    }

    let atr = indicators.atr_at(exec_index);
    if settings.entry_requires_atr() && atr.is_none() {
        return None;
    }

    let (stop_loss, take_profit) = match settings.risk_mode {
        RiskMode::Atr => {
            let stop = settings
                .stop_loss_atr
                .and_then(|m| atr.map(|a| fill - dir * m * a));
            let target = settings
                .take_profit_atr
                .and_then(|m| atr.map(|a| fill + dir * m * a));
            (stop, target)
        }
        RiskMode::Percent => {
            let stop = settings.stop_loss_pct.map(|p| fill * (1.0 - dir * p / 100.0));
            let target = settings
                .take_profit_pct
                .map(|p| fill * (1.0 + dir * p / 100.0));
            (stop, target)
        }
    };

    let risk_per_share = match stop_loss {
        Some(stop) => (fill - stop).abs(),
        None => atr.unwrap_or(fill * FALLBACK_RISK_FRACTION),
    };

    let partial_target = settings
        .partial_target_r
        .map(|r| fill + dir * r * risk_per_share);

    Some(PositionState {
        direction,
        entry_index: exec_index,
        entry_time: bars[exec_index].time,
        entry_price: fill,
        size,
        entry_commission_per_share: fill * commission_rate,
        stop_loss,
        take_profit,
        risk_per_share,
        bars_in_trade: 0,
        extreme_price: fill,
        partial_target,
        partial_taken: false,
        break_even_applied: false,
    })
}

//! Trade/equity aggregation: accumulators and scalar statistics.
//!
//! Both engine variants (full and compact) feed the same accumulators in the
//! same order, so their aggregate statistics are bit-identical by
//! construction. Every metric is total: degenerate inputs produce the
//! documented fallback value, never NaN.

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

/// Sharpe is suppressed below this many closed trades.
const SHARPE_MIN_TRADES: usize = 5;
/// ...and below this return standard deviation (numerical noise guard).
const SHARPE_MIN_STDEV: f64 = 1e-4;
/// Sharpe is clamped into this range to avoid blow-up on tiny samples.
const SHARPE_CLAMP: f64 = 8.0;

/// Running sums and moments over closed trades.
///
/// Order-independent for counts/sums; return moments are accumulated in
/// trade order so both engine variants produce identical floats.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeTally {
    pub count: usize,
    pub winners: usize,
    pub losers: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub sum_pnl: f64,
    ret_sum: f64,
    ret_sum_sq: f64,
}

impl TradeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, trade: &Trade) {
        self.count += 1;
        if trade.pnl > 0.0 {
            self.winners += 1;
            self.gross_profit += trade.pnl;
        } else if trade.pnl < 0.0 {
            self.losers += 1;
            self.gross_loss += -trade.pnl;
        } else {
            self.losers += 1;
        }
        self.sum_pnl += trade.pnl;
        self.ret_sum += trade.pnl_percent;
        self.ret_sum_sq += trade.pnl_percent * trade.pnl_percent;
    }

    /// Sharpe ratio from per-trade percent returns, moment form.
    ///
    /// Forced to 0 with fewer than 5 trades or stdev below 1e-4; clamped to
    /// [-8, 8].
    pub fn sharpe(&self) -> f64 {
        let n = self.count;
        if n < SHARPE_MIN_TRADES {
            return 0.0;
        }
        let mean = self.ret_sum / n as f64;
        let variance = (self.ret_sum_sq - n as f64 * mean * mean) / (n as f64 - 1.0);
        if !variance.is_finite() || variance <= 0.0 {
            return 0.0;
        }
        let stdev = variance.sqrt();
        if stdev < SHARPE_MIN_STDEV {
            return 0.0;
        }
        (mean / stdev).clamp(-SHARPE_CLAMP, SHARPE_CLAMP)
    }
}

/// Running-peak drawdown over per-bar equity values.
///
/// `max_drawdown` is a positive magnitude; the percent is captured at the
/// bar where the maximum was set (path-dependent, so it cannot be derived
/// from the final curve endpoints).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownTracker {
    peak: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
}

impl Default for DrawdownTracker {
    fn default() -> Self {
        Self {
            peak: f64::NEG_INFINITY,
            max_drawdown: 0.0,
            max_drawdown_percent: 0.0,
        }
    }
}

impl DrawdownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, equity: f64) {
        if !equity.is_finite() {
            return;
        }
        if equity > self.peak {
            self.peak = equity;
        }
        let dd = self.peak - equity;
        if dd > self.max_drawdown {
            self.max_drawdown = dd;
            self.max_drawdown_percent = if self.peak > 0.0 {
                dd / self.peak * 100.0
            } else {
                0.0
            };
        }
    }
}

/// Scalar statistics of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub net_profit: f64,
    pub net_profit_percent: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Fraction in [0, 1].
    pub win_rate: f64,
    pub avg_trade: f64,
    /// Positive magnitudes.
    pub avg_win: f64,
    pub avg_loss: f64,
    /// `win_rate * avg_win - loss_rate * avg_loss`.
    pub expectancy: f64,
    /// `+inf` when there are profits and no losses; 0 with no profits.
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub sharpe_ratio: f64,
}

impl Stats {
    /// All-zero statistics for empty input.
    pub fn zero() -> Self {
        Self {
            net_profit: 0.0,
            net_profit_percent: 0.0,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            avg_trade: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            expectancy: 0.0,
            profit_factor: 0.0,
            max_drawdown: 0.0,
            max_drawdown_percent: 0.0,
            sharpe_ratio: 0.0,
        }
    }

    pub fn from_parts(tally: &TradeTally, drawdown: &DrawdownTracker, initial_capital: f64) -> Self {
        let n = tally.count;
        let win_rate = if n > 0 {
            tally.winners as f64 / n as f64
        } else {
            0.0
        };
        let avg_win = if tally.winners > 0 {
            tally.gross_profit / tally.winners as f64
        } else {
            0.0
        };
        let avg_loss = if tally.losers > 0 {
            tally.gross_loss / tally.losers as f64
        } else {
            0.0
        };
        let profit_factor = if tally.gross_loss > 0.0 {
            tally.gross_profit / tally.gross_loss
        } else if tally.gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Self {
            net_profit: tally.sum_pnl,
            net_profit_percent: if initial_capital > 0.0 {
                tally.sum_pnl / initial_capital * 100.0
            } else {
                0.0
            },
            total_trades: n,
            winning_trades: tally.winners,
            losing_trades: tally.losers,
            win_rate,
            avg_trade: if n > 0 { tally.sum_pnl / n as f64 } else { 0.0 },
            avg_win,
            avg_loss,
            expectancy: win_rate * avg_win - (1.0 - win_rate) * avg_loss,
            profit_factor,
            max_drawdown: drawdown.max_drawdown,
            max_drawdown_percent: drawdown.max_drawdown_percent,
            sharpe_ratio: tally.sharpe(),
        }
    }
}

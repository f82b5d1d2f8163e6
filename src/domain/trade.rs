//! Trade — an immutable record of one full or partial exit.

use super::position::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position (or part of one) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    Partial,
    TimeStop,
    EndOfData,
}

/// A realized round trip: entry → (full or partial) exit.
///
/// `pnl` is net of all fees; `fees` includes the pro-rata entry commission
/// and the exit commission for the closed quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: usize,
    pub direction: Direction,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
    /// Net pnl as a percent of the entry cost basis for the closed quantity.
    pub pnl_percent: f64,
    pub fees: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

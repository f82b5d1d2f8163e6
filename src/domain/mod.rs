//! Domain types: bars, signals, positions, trades, equity points.

pub mod bar;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use position::{BookState, Direction, PositionState};
pub use signal::{Signal, SignalKind};
pub use trade::{ExitReason, Trade};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One point of the per-bar equity curve: `value = cash + unrealized pnl`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub value: f64,
}

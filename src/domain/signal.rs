//! Raw strategy signals — the engine's input events.
//!
//! Signals come from an opaque strategy component. No ordering guarantee is
//! assumed; the signal preparer resolves, filters, and stably sorts them.

use super::position::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of a raw signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Buy,
    Sell,
}

impl SignalKind {
    pub fn opposite(self) -> Self {
        match self {
            SignalKind::Buy => SignalKind::Sell,
            SignalKind::Sell => SignalKind::Buy,
        }
    }

    /// The position direction this signal opens when treated as an entry.
    pub fn entry_direction(self) -> Direction {
        match self {
            SignalKind::Buy => Direction::Long,
            SignalKind::Sell => Direction::Short,
        }
    }
}

/// A raw `(time, kind, price)` event produced by a strategy.
///
/// `bar_index` is an optional producer-supplied hint; when absent the
/// preparer resolves the bar by exact time lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub time: NaiveDateTime,
    pub kind: SignalKind,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bar_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
}

impl Signal {
    pub fn new(time: NaiveDateTime, kind: SignalKind, price: f64) -> Self {
        Self {
            time,
            kind,
            price,
            bar_index: None,
            reason: None,
            trigger_price: None,
        }
    }
}

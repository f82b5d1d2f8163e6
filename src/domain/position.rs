//! Position state — the mutable unit of the lifecycle state machine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short. Used to fold both sides into one formula.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// Mutable state of one open position.
///
/// Exactly zero or one of these exists per book at any bar. Created by the
/// position builder, mutated every bar it survives, destroyed on full exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub direction: Direction,
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub size: f64,
    /// Entry commission already paid, per share, attributed to exits pro rata.
    pub entry_commission_per_share: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    /// Stop distance at entry; drives break-even and partial-target levels.
    pub risk_per_share: f64,
    pub bars_in_trade: usize,
    /// Most favorable price seen since entry (high for longs, low for shorts).
    pub extreme_price: f64,
    pub partial_target: Option<f64>,
    pub partial_taken: bool,
    pub break_even_applied: bool,
}

impl PositionState {
    /// Mark-to-market pnl at `price`, net of the entry commission already paid.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) * self.size
            - self.entry_commission_per_share * self.size
    }
}

/// The book's state machine: `Flat` or exactly one open position.
///
/// Modeled as a sum type so two simultaneous positions are unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BookState {
    Flat,
    Open(PositionState),
}

impl BookState {
    pub fn is_open(&self) -> bool {
        matches!(self, BookState::Open(_))
    }

    pub fn as_open(&self) -> Option<&PositionState> {
        match self {
            BookState::Open(pos) => Some(pos),
            BookState::Flat => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_position(direction: Direction) -> PositionState {
        PositionState {
            direction,
            entry_index: 3,
            entry_time: NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            entry_price: 100.0,
            size: 50.0,
            entry_commission_per_share: 0.1,
            stop_loss: Some(95.0),
            take_profit: Some(110.0),
            risk_per_share: 5.0,
            bars_in_trade: 0,
            extreme_price: 100.0,
            partial_target: None,
            partial_taken: false,
            break_even_applied: false,
        }
    }

    #[test]
    fn unrealized_pnl_long() {
        let pos = sample_position(Direction::Long);
        // (104 - 100) * 50 - 0.1 * 50 = 195
        assert!((pos.unrealized_pnl(104.0) - 195.0).abs() < 1e-10);
    }

    #[test]
    fn unrealized_pnl_short() {
        let pos = sample_position(Direction::Short);
        // -(104 - 100) * 50 - 0.1 * 50 = -205
        assert!((pos.unrealized_pnl(104.0) + 205.0).abs() < 1e-10);
    }

    #[test]
    fn book_state_transitions() {
        let mut book = BookState::Flat;
        assert!(!book.is_open());
        book = BookState::Open(sample_position(Direction::Long));
        assert!(book.is_open());
        assert_eq!(book.as_open().unwrap().size, 50.0);
        book = BookState::Flat;
        assert!(book.as_open().is_none());
    }

    #[test]
    fn direction_sign_and_opposite() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
        assert_eq!(Direction::Long.opposite(), Direction::Short);
    }
}

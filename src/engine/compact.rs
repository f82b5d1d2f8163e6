//! Memory-lean sink: running accumulators instead of trade/equity ledgers.
//!
//! Feeds the same `TradeTally`/`DrawdownTracker` the full sink feeds, in the
//! same event order, so the resulting statistics match the full run exactly.

use chrono::NaiveDateTime;

use crate::domain::Trade;
use crate::stats::{DrawdownTracker, Stats, TradeTally};

use super::book::BookSink;

#[derive(Debug, Default)]
pub struct CompactSink {
    tally: TradeTally,
    drawdown: DrawdownTracker,
}

impl CompactSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_stats(self, initial_capital: f64) -> Stats {
        Stats::from_parts(&self.tally, &self.drawdown, initial_capital)
    }
}

impl BookSink for CompactSink {
    fn on_trade(&mut self, trade: Trade) {
        self.tally.add(&trade);
    }

    fn on_equity(&mut self, _time: NaiveDateTime, value: f64) {
        self.drawdown.observe(value);
    }
}

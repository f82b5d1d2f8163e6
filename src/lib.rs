//! tradesim — bar-replay trade simulation engine.
//!
//! Feed it a bar series, a list of raw strategy signals, and sparse
//! settings; it replays the bars through a deterministic position lifecycle
//! and returns the trade ledger, per-bar equity curve, and aggregate
//! statistics.
//!
//! - Settings normalization: sparse input → fully-resolved knobs
//! - Indicator precompute with cross-run caching (ATR, EMA, SMA, RSI, ADX)
//! - Signal preparation: execution models, entry filters, regime gates
//! - Position lifecycle: stops, targets, partials, trailing, time stops
//! - Full and compact engine variants with identical statistics
//! - Combined long/short books with split capital
//! - Parallel batch execution for parameter sweeps

pub mod batch;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod settings;
pub mod stats;
pub mod synthetic;
pub mod validate;

pub use domain::{Bar, BookState, Direction, EquityPoint, ExitReason, Signal, SignalKind, Trade};
pub use engine::{run_backtest, run_compact, BacktestResult};
pub use indicators::IndicatorSet;
pub use settings::{BacktestSettings, ExecutionModel, NormalizedSettings, RiskMode, TradeDirection};
pub use stats::Stats;

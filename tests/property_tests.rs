//! Property tests for engine invariants.
//!
//! Verified over seeded random-walk data and randomized settings:
//! 1. Determinism — identical inputs give byte-identical serialized results
//! 2. Compact/full equivalence — both variants agree on every statistic
//! 3. Accounting — net profit equals the sum of trade pnl; the final equity
//!    of a flat, fee-free book equals initial capital plus net profit
//! 4. Statistic guards — Sharpe stays in [-8, 8], drawdown is non-negative,
//!    win rate is a fraction

use proptest::prelude::*;

use tradesim::synthetic::{alternating_signals, random_walk_bars};
use tradesim::{run_backtest, run_compact, BacktestSettings, TradeDirection};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_direction() -> impl Strategy<Value = TradeDirection> {
    prop_oneof![
        Just(TradeDirection::Long),
        Just(TradeDirection::Short),
        Just(TradeDirection::Both),
        Just(TradeDirection::Combined),
    ]
}

fn arb_settings() -> impl Strategy<Value = BacktestSettings> {
    (
        arb_direction(),
        proptest::option::of(1.0..4.0_f64),  // stop_loss_atr
        proptest::option::of(1.0..5.0_f64),  // take_profit_atr
        proptest::option::of(1.0..3.0_f64),  // trailing_atr
        proptest::option::of(2_usize..30),   // time_stop_bars
        0.0..20.0_f64,                       // slippage_bps
        0.0..0.5_f64,                        // commission_pct
        2_usize..21,                         // atr_period
    )
        .prop_map(
            |(direction, stop, target, trail, time_stop, slip, comm, atr)| BacktestSettings {
                trade_direction: Some(direction),
                stop_loss_atr: stop,
                take_profit_atr: target,
                trailing_atr: trail,
                time_stop_bars: time_stop,
                slippage_bps: Some(slip),
                commission_pct: Some(comm),
                atr_period: Some(atr),
                ..Default::default()
            },
        )
}

proptest! {
    /// Same inputs, byte-identical serialized output.
    #[test]
    fn runs_are_deterministic(
        seed in any::<u64>(),
        n in 50_usize..300,
        every in 3_usize..25,
        settings in arb_settings(),
    ) {
        let bars = random_walk_bars(n, seed);
        let signals = alternating_signals(&bars, every);

        let a = run_backtest(&bars, &signals, &settings, 100_000.0, None);
        let b = run_backtest(&bars, &signals, &settings, 100_000.0, None);
        let a_json = serde_json::to_string(&a).unwrap();
        let b_json = serde_json::to_string(&b).unwrap();
        prop_assert_eq!(a_json, b_json);
    }

    /// The compact variant reproduces the full variant's statistics exactly.
    #[test]
    fn compact_equals_full(
        seed in any::<u64>(),
        n in 50_usize..300,
        every in 3_usize..25,
        settings in arb_settings(),
    ) {
        let bars = random_walk_bars(n, seed);
        let signals = alternating_signals(&bars, every);

        let full = run_backtest(&bars, &signals, &settings, 100_000.0, None);
        let compact = run_compact(&bars, &signals, &settings, 100_000.0, None);
        prop_assert_eq!(full.stats, compact);
    }

    /// Net profit is exactly the sum of trade pnl, accumulated in ledger order.
    #[test]
    fn net_profit_is_sum_of_trade_pnl(
        seed in any::<u64>(),
        n in 50_usize..300,
        every in 3_usize..25,
        settings in arb_settings(),
    ) {
        let bars = random_walk_bars(n, seed);
        let signals = alternating_signals(&bars, every);

        let result = run_backtest(&bars, &signals, &settings, 100_000.0, None);
        let total = result.trades.iter().fold(0.0, |acc, t| acc + t.pnl);
        prop_assert_eq!(result.stats.net_profit, total);
        prop_assert_eq!(result.stats.total_trades, result.trades.len());
    }

    /// Without fees or slippage, the final equity of a (force-)closed book
    /// is initial capital plus net profit.
    #[test]
    fn final_equity_reconciles_when_frictionless(
        seed in any::<u64>(),
        n in 50_usize..300,
        every in 3_usize..25,
    ) {
        let bars = random_walk_bars(n, seed);
        let signals = alternating_signals(&bars, every);
        let settings = BacktestSettings::default();

        let result = run_backtest(&bars, &signals, &settings, 100_000.0, None);
        let last = result.equity_curve.last().unwrap().value;
        let expected = 100_000.0 + result.stats.net_profit;
        prop_assert!(
            (last - expected).abs() <= 1e-6 * expected.abs().max(1.0),
            "final equity {} vs initial+net {}",
            last,
            expected
        );
    }

    /// Statistic guards hold for arbitrary inputs.
    #[test]
    fn statistics_stay_in_bounds(
        seed in any::<u64>(),
        n in 50_usize..300,
        every in 3_usize..25,
        settings in arb_settings(),
    ) {
        let bars = random_walk_bars(n, seed);
        let signals = alternating_signals(&bars, every);

        let stats = run_compact(&bars, &signals, &settings, 100_000.0, None);
        prop_assert!((-8.0..=8.0).contains(&stats.sharpe_ratio));
        prop_assert!(stats.max_drawdown >= 0.0);
        prop_assert!(stats.max_drawdown_percent >= 0.0);
        prop_assert!((0.0..=1.0).contains(&stats.win_rate));
        prop_assert!(stats.profit_factor >= 0.0);
        prop_assert!(!stats.net_profit.is_nan());
        prop_assert_eq!(
            stats.total_trades,
            stats.winning_trades + stats.losing_trades
        );
        if stats.total_trades < 5 {
            prop_assert_eq!(stats.sharpe_ratio, 0.0);
        }
    }

    /// The equity curve has exactly one point per bar, time-aligned.
    #[test]
    fn equity_curve_is_bar_aligned(
        seed in any::<u64>(),
        n in 50_usize..300,
        every in 3_usize..25,
        settings in arb_settings(),
    ) {
        let bars = random_walk_bars(n, seed);
        let signals = alternating_signals(&bars, every);

        let result = run_backtest(&bars, &signals, &settings, 100_000.0, None);
        prop_assert_eq!(result.equity_curve.len(), bars.len());
        for (bar, point) in bars.iter().zip(&result.equity_curve) {
            prop_assert_eq!(bar.time, point.time);
        }
    }
}

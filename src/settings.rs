//! Settings normalization: sparse caller input → fully-resolved settings.
//!
//! `BacktestSettings` is what callers hand in: every field optional, every
//! filter absent by default. `normalize()` maps it to `NormalizedSettings`
//! where each knob is a concrete value or a tagged `Option` (no "0 means
//! disabled" sentinels). Normalization is pure and never fails: invalid or
//! non-finite input silently falls back to the documented default.

use serde::{Deserialize, Serialize};

/// Which bar/price a prepared signal fills at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionModel {
    /// Fill on the signal bar at the signal's own price.
    SignalClose,
    /// Fill on the next bar at its open.
    NextOpen,
    /// Fill on the next bar at its close.
    NextClose,
}

/// Which entries the book accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Long,
    Short,
    Both,
    /// Split capital across an independent long-only and short-only book.
    Combined,
}

/// How initial stop-loss / take-profit levels are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMode {
    /// Levels at entry ± multiple × ATR.
    Atr,
    /// Levels at entry ± percent of entry price.
    Percent,
}

/// Market regime classification used by the market-mode filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketMode {
    Trend,
    Downtrend,
    Sideways,
}

/// Sparse caller-facing settings. Every field is optional; see `normalize`
/// for defaults and clamping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    // ── Execution ──
    pub execution_model: Option<ExecutionModel>,
    pub trade_direction: Option<TradeDirection>,
    pub slippage_bps: Option<f64>,
    pub commission_pct: Option<f64>,
    pub allow_same_bar_exit: Option<bool>,
    /// Breakout-confirmation mode: wait for a close beyond the signal price.
    pub confirm_close: Option<bool>,

    // ── Sizing ──
    pub position_size_pct: Option<f64>,
    pub fixed_trade_amount: Option<f64>,

    // ── Risk management ──
    pub risk_mode: Option<RiskMode>,
    pub atr_period: Option<usize>,
    pub stop_loss_atr: Option<f64>,
    pub take_profit_atr: Option<f64>,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub trailing_atr: Option<f64>,
    pub break_even_r: Option<f64>,
    pub partial_target_r: Option<f64>,
    pub partial_fraction: Option<f64>,
    pub time_stop_bars: Option<usize>,

    // ── Entry filters ──
    pub trend_ema_period: Option<usize>,
    pub volume_sma_period: Option<usize>,
    pub volume_multiple: Option<f64>,
    pub rsi_period: Option<usize>,
    pub rsi_bullish: Option<f64>,
    pub rsi_bearish: Option<f64>,
    pub adx_period: Option<usize>,
    pub adx_minimum: Option<f64>,
    pub breakout_lookback: Option<usize>,

    // ── Regime filters ──
    pub market_mode: Option<MarketMode>,
    pub atr_pct_min: Option<f64>,
    pub atr_pct_max: Option<f64>,
    pub adx_min: Option<f64>,
    pub adx_max: Option<f64>,
}

/// Trend entry filter: close must be on the right side of a rising/falling EMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendFilter {
    pub ema_period: usize,
}

/// Volume entry filter: bar volume must exceed a multiple of its SMA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeFilter {
    pub sma_period: usize,
    pub multiple: f64,
}

/// RSI entry filter: momentum threshold per direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiFilter {
    pub period: usize,
    pub bullish: f64,
    pub bearish: f64,
}

/// ADX floor entry filter: minimum trend strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdxFilter {
    pub period: usize,
    pub minimum: f64,
}

/// N-bar breakout entry filter: close beyond the prior N-bar extreme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakoutFilter {
    pub lookback: usize,
}

/// Fully-resolved settings: every knob concrete, every optional rule tagged.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSettings {
    pub execution_model: ExecutionModel,
    pub trade_direction: TradeDirection,
    pub slippage_bps: f64,
    pub commission_pct: f64,
    pub allow_same_bar_exit: bool,
    pub confirm_close: bool,

    pub position_size_pct: f64,
    pub fixed_trade_amount: Option<f64>,

    pub risk_mode: RiskMode,
    pub atr_period: usize,
    pub stop_loss_atr: Option<f64>,
    pub take_profit_atr: Option<f64>,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    pub trailing_atr: Option<f64>,
    pub break_even_r: Option<f64>,
    pub partial_target_r: Option<f64>,
    pub partial_fraction: f64,
    pub time_stop_bars: Option<usize>,

    pub trend: Option<TrendFilter>,
    pub volume: Option<VolumeFilter>,
    pub rsi: Option<RsiFilter>,
    pub adx: Option<AdxFilter>,
    pub breakout: Option<BreakoutFilter>,

    pub market_mode: Option<MarketMode>,
    pub atr_pct_band: Option<(f64, f64)>,
    pub adx_band: Option<(f64, f64)>,
}

/// Default EMA period for market-mode classification when no trend filter
/// supplies one.
const DEFAULT_REGIME_EMA_PERIOD: usize = 50;
/// Default ADX period when only the regime band is configured.
const DEFAULT_ADX_PERIOD: usize = 14;

/// Keep a float only if it is finite and strictly positive.
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Clamp a float into [lo, hi], treating non-finite input as absent.
fn clamped(value: Option<f64>, lo: f64, hi: f64) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(lo, hi))
}

fn period(value: Option<usize>) -> Option<usize> {
    value.filter(|p| *p >= 1)
}

impl BacktestSettings {
    /// Resolve every knob to a concrete value. Pure, total, never fails.
    pub fn normalize(&self) -> NormalizedSettings {
        let volume = period(self.volume_sma_period).map(|sma_period| VolumeFilter {
            sma_period,
            multiple: positive(self.volume_multiple).unwrap_or(1.5),
        });

        let rsi = period(self.rsi_period).map(|p| RsiFilter {
            period: p,
            bullish: clamped(self.rsi_bullish, 0.0, 100.0).unwrap_or(50.0),
            bearish: clamped(self.rsi_bearish, 0.0, 100.0).unwrap_or(50.0),
        });

        // The ADX entry filter needs an explicit minimum; a bare period with
        // no floor is a no-op and is treated as absent.
        let adx = match (
            period(self.adx_period),
            clamped(self.adx_minimum, 0.0, 100.0),
        ) {
            (p, Some(minimum)) => Some(AdxFilter {
                period: p.unwrap_or(DEFAULT_ADX_PERIOD),
                minimum,
            }),
            _ => None,
        };

        let atr_pct_band = band(
            clamped(self.atr_pct_min, 0.0, f64::MAX),
            clamped(self.atr_pct_max, 0.0, f64::MAX),
        );
        let adx_band = band(
            clamped(self.adx_min, 0.0, 100.0),
            clamped(self.adx_max, 0.0, 100.0),
        );

        NormalizedSettings {
            execution_model: self.execution_model.unwrap_or(ExecutionModel::SignalClose),
            trade_direction: self.trade_direction.unwrap_or(TradeDirection::Long),
            slippage_bps: positive(self.slippage_bps).unwrap_or(0.0),
            commission_pct: clamped(self.commission_pct, 0.0, 100.0).unwrap_or(0.0),
            allow_same_bar_exit: self.allow_same_bar_exit.unwrap_or(true),
            confirm_close: self.confirm_close.unwrap_or(false),

            position_size_pct: clamped(self.position_size_pct, 0.0, 100.0)
                .filter(|p| *p > 0.0)
                .unwrap_or(100.0),
            fixed_trade_amount: positive(self.fixed_trade_amount),

            risk_mode: self.risk_mode.unwrap_or(RiskMode::Atr),
            atr_period: period(self.atr_period).unwrap_or(14),
            stop_loss_atr: positive(self.stop_loss_atr),
            take_profit_atr: positive(self.take_profit_atr),
            stop_loss_pct: clamped(self.stop_loss_pct, 0.0, 100.0).filter(|p| *p > 0.0),
            take_profit_pct: clamped(self.take_profit_pct, 0.0, 100.0).filter(|p| *p > 0.0),
            trailing_atr: positive(self.trailing_atr),
            break_even_r: positive(self.break_even_r),
            partial_target_r: positive(self.partial_target_r),
            partial_fraction: clamped(self.partial_fraction, 0.01, 0.99).unwrap_or(0.5),
            time_stop_bars: self.time_stop_bars.filter(|n| *n >= 1),

            trend: period(self.trend_ema_period).map(|ema_period| TrendFilter { ema_period }),
            volume,
            rsi,
            adx,
            breakout: period(self.breakout_lookback).map(|lookback| BreakoutFilter { lookback }),

            market_mode: self.market_mode,
            atr_pct_band,
            adx_band,
        }
    }
}

/// Build a band from partial bounds, swapping if min > max.
fn band(min: Option<f64>, max: Option<f64>) -> Option<(f64, f64)> {
    match (min, max) {
        (None, None) => None,
        (Some(lo), None) => Some((lo, f64::MAX)),
        (None, Some(hi)) => Some((0.0, hi)),
        (Some(lo), Some(hi)) if lo <= hi => Some((lo, hi)),
        (Some(lo), Some(hi)) => Some((hi, lo)),
    }
}

impl NormalizedSettings {
    /// Whether any rule needs the ATR series.
    pub fn needs_atr(&self) -> bool {
        self.trailing_atr.is_some()
            || self.atr_pct_band.is_some()
            || (self.risk_mode == RiskMode::Atr
                && (self.stop_loss_atr.is_some()
                    || self.take_profit_atr.is_some()
                    || self.break_even_r.is_some()
                    || self.partial_target_r.is_some()))
    }

    pub fn needs_trend_ema(&self) -> bool {
        self.trend.is_some() || self.market_mode.is_some()
    }

    /// EMA period used for the trend filter and market-mode classification.
    pub fn trend_ema_period(&self) -> usize {
        self.trend
            .map(|t| t.ema_period)
            .unwrap_or(DEFAULT_REGIME_EMA_PERIOD)
    }

    pub fn needs_adx(&self) -> bool {
        self.adx.is_some() || self.adx_band.is_some()
    }

    /// ADX period shared by the entry filter and the regime band.
    pub fn adx_period(&self) -> usize {
        self.adx.map(|f| f.period).unwrap_or(DEFAULT_ADX_PERIOD)
    }

    pub fn needs_volume_sma(&self) -> bool {
        self.volume.is_some()
    }

    pub fn needs_rsi(&self) -> bool {
        self.rsi.is_some()
    }

    /// Whether the entry builder requires a defined ATR at the entry bar.
    pub fn entry_requires_atr(&self) -> bool {
        self.risk_mode == RiskMode::Atr
            && (self.stop_loss_atr.is_some()
                || self.take_profit_atr.is_some()
                || self.partial_target_r.is_some()
                || self.break_even_r.is_some())
    }
}

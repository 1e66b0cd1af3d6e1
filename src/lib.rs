//! # ict-structure
//!
//! Incremental price-action structure detection for ICT-style analysis:
//! swing pivots, fair value gaps, structure breaks and order blocks, each
//! zone tracked through its mitigation lifecycle.
//!
//! ## Quick Start
//!
//! ```rust
//! use ict_structure::prelude::*;
//!
//! let mut engine = EngineBuilder::new()
//!     .swing_strength(2)
//!     .build()
//!     .unwrap();
//!
//! // Bars arrive one at a time, in increasing index order.
//! let highs = [1.0, 2.0, 5.0, 2.0, 1.0];
//! for (i, h) in highs.iter().enumerate() {
//!     engine
//!         .push_bar(Bar::new(i, i as i64 * 60, h - 0.5, *h, h - 1.0, h - 0.25))
//!         .unwrap();
//! }
//!
//! let pivots = engine.swing_points();
//! assert_eq!(pivots.len(), 1);
//! assert_eq!(pivots[0].bar_index, 2);
//! ```
//!
//! The pattern collections live in a shared [`PatternStore`]. A rendering
//! thread can hold the handle returned by [`StructureEngine::store`] and take
//! snapshots while the engine keeps processing bars.

use std::sync::Arc;

use tracing::{debug, trace, warn};

pub mod detectors;
pub mod params;
pub mod series;
pub mod store;

pub mod prelude {
    pub use crate::{
        // Detectors
        detectors::*,
        // Parameters
        params::{ParamMeta, ParamType, ParameterizedConfig},
        // Parallel
        replay_parallel,
        series::BarSeries,
        store::{PatternSnapshot, PatternStore, PruneReport, RetentionPolicy},
        // Types
        Bar,
        BreakLabel,
        Direction,
        // Engine
        EngineBuilder,
        EngineConfig,
        FairValueGap,
        OHLCExt,
        OrderBlock,
        // Errors
        PatternError,
        Period,
        ReplayError,
        ReplayResult,
        Result,
        StructureBreak,
        StructureEngine,
        SwingKind,
        SwingPoint,
        Zone,
        OHLC,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors that can occur while configuring the engine or feeding it bars
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Bar {index} is out of order: last accepted bar is {last}")]
    OutOfOrderBar { index: usize, last: usize },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core OHLC data trait, implemented by host bar types
pub trait OHLC {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCExt: OHLC {
    /// True when the bar's high/low range touches the closed interval `[bottom, top]`
    #[inline]
    fn overlaps(&self, top: f64, bottom: f64) -> bool {
        self.high() >= bottom && self.low() <= top
    }
}

impl<T: OHLC> OHLCExt for T {}

/// A closed bar as the engine stores it.
///
/// `index` is the host's bar number. Indices must strictly increase within a
/// session but may skip.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub index: usize,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(index: usize, timestamp: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            index,
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Reject NaN or infinite prices and `high < low`
    pub fn validate(&self) -> Result<()> {
        let prices = [self.open, self.high, self.low, self.close];
        let reason = if prices.iter().any(|p| p.is_nan()) {
            "NaN in OHLC"
        } else if prices.iter().any(|p| p.is_infinite()) {
            "Infinite value in OHLC"
        } else if self.high < self.low {
            "high < low"
        } else {
            return Ok(());
        };
        Err(PatternError::InvalidBar {
            index: self.index,
            reason,
        })
    }

    /// Copy a host bar. Hosts without timestamps get `0`; detection never reads it.
    pub fn from_ohlc<T: OHLC + ?Sized>(index: usize, bar: &T) -> Self {
        Self {
            index,
            timestamp: bar.timestamp().unwrap_or_default(),
            open: bar.open(),
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
        }
    }
}

impl OHLC for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// PATTERN TYPES
// ============================================================

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Polarity of a swing pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

impl SwingKind {
    #[inline]
    pub fn is_high(self) -> bool {
        matches!(self, SwingKind::High)
    }

    /// Chart label ("PH" / "PL")
    pub fn as_str(self) -> &'static str {
        match self {
            SwingKind::High => "PH",
            SwingKind::Low => "PL",
        }
    }
}

/// A confirmed swing pivot
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwingPoint {
    pub price: f64,
    pub bar_index: usize,
    pub kind: SwingKind,
}

/// A 3-bar imbalance between bar `start_bar_index` and bar `start_bar_index + 2`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FairValueGap {
    pub top: f64,
    pub bottom: f64,
    pub start_bar_index: usize,
    pub direction: Direction,
    pub mitigated: bool,
}

/// Classification of a structure break.
///
/// Only break-of-structure is produced; market-structure-shift
/// classification is not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BreakLabel {
    Bos,
}

impl BreakLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakLabel::Bos => "BOS",
        }
    }
}

/// A close through a confirmed pivot level
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructureBreak {
    /// Bar of the broken pivot
    pub start_bar_index: usize,
    /// Bar that closed through the level
    pub end_bar_index: usize,
    pub price_level: f64,
    pub direction: Direction,
    pub label: BreakLabel,
}

/// The originating extreme bar of the leg that produced a structure break
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderBlock {
    pub top: f64,
    pub bottom: f64,
    pub start_bar_index: usize,
    pub direction: Direction,
    pub mitigated: bool,
}

/// Price zone with a monotonic mitigation flag
pub trait Zone {
    fn top(&self) -> f64;
    fn bottom(&self) -> f64;
    fn start_bar_index(&self) -> usize;
    fn direction(&self) -> Direction;
    fn is_mitigated(&self) -> bool;
    /// Flip the flag to mitigated. There is no way back.
    fn mark_mitigated(&mut self);
}

macro_rules! impl_zone {
    ($($zone:ty),* $(,)?) => {
        $(impl Zone for $zone {
            #[inline]
            fn top(&self) -> f64 { self.top }
            #[inline]
            fn bottom(&self) -> f64 { self.bottom }
            #[inline]
            fn start_bar_index(&self) -> usize { self.start_bar_index }
            #[inline]
            fn direction(&self) -> Direction { self.direction }
            #[inline]
            fn is_mitigated(&self) -> bool { self.mitigated }
            #[inline]
            fn mark_mitigated(&mut self) { self.mitigated = true; }
        })*
    };
}

impl_zone!(FairValueGap, OrderBlock);

// ============================================================
// ENGINE CONFIG
// ============================================================

/// Default swing window half-width
pub const DEFAULT_SWING_STRENGTH: usize = 5;
/// Bars after formation before a gap can be mitigated
pub const DEFAULT_GAP_GRACE_BARS: usize = 2;
/// Bars after formation before an order block can be mitigated
pub const DEFAULT_ORDER_BLOCK_GRACE_BARS: usize = 5;

/// Engine configuration. Fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pivot window half-width
    pub swing_strength: Period,
    pub detect_gaps: bool,
    pub detect_order_blocks: bool,
    pub order_block_grace_bars: usize,
    /// Must be at least 2: the gap's own third bar always overlaps it
    pub gap_grace_bars: usize,
    /// Reject NaN/infinite prices and `high < low`
    pub validate_data: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            swing_strength: Period::new_const(DEFAULT_SWING_STRENGTH),
            detect_gaps: true,
            detect_order_blocks: true,
            order_block_grace_bars: DEFAULT_ORDER_BLOCK_GRACE_BARS,
            gap_grace_bars: DEFAULT_GAP_GRACE_BARS,
            validate_data: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.swing_strength.get() == 0 {
            return Err(PatternError::InvalidConfig(
                "swing_strength must be >= 1".to_string(),
            ));
        }
        if self.gap_grace_bars < DEFAULT_GAP_GRACE_BARS {
            return Err(PatternError::InvalidConfig(format!(
                "gap_grace_bars must be >= {DEFAULT_GAP_GRACE_BARS}, got {}",
                self.gap_grace_bars
            )));
        }
        Ok(())
    }
}

// ============================================================
// STRUCTURE ENGINE
// ============================================================

use detectors::{
    GapTracker, MitigationRule, OrderBlockLocator, StructureBreakDetector, SwingDetector, SwingState,
};
use series::BarSeries;
use store::{PatternSnapshot, PatternStore};

/// Single-writer detection engine for one instrument.
///
/// Each [`push_bar`](Self::push_bar) runs one full evaluation pass:
/// swings, gaps, structure breaks, order blocks, then both mitigation sweeps.
#[derive(Debug)]
pub struct StructureEngine {
    config: EngineConfig,
    series: BarSeries,
    swings: SwingDetector,
    gaps: GapTracker,
    breaks: StructureBreakDetector,
    order_blocks: OrderBlockLocator,
    store: Arc<PatternStore>,
}

impl StructureEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            swings: SwingDetector::new(config.swing_strength),
            gaps: GapTracker::new(config.gap_grace_bars),
            breaks: StructureBreakDetector::new(),
            order_blocks: OrderBlockLocator::new(config.order_block_grace_bars),
            series: BarSeries::new(),
            store: Arc::new(PatternStore::new()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bars accepted so far in this session
    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    /// Last confirmed pivot bars
    pub fn swing_state(&self) -> SwingState {
        *self.swings.state()
    }

    /// Shared handle to the pattern collections, for readers on other threads
    pub fn store(&self) -> Arc<PatternStore> {
        Arc::clone(&self.store)
    }

    pub fn swing_points(&self) -> Vec<SwingPoint> {
        self.store.swing_points()
    }

    pub fn fair_value_gaps(&self) -> Vec<FairValueGap> {
        self.store.fair_value_gaps()
    }

    pub fn structure_breaks(&self) -> Vec<StructureBreak> {
        self.store.structure_breaks()
    }

    pub fn order_blocks(&self) -> Vec<OrderBlock> {
        self.store.order_blocks()
    }

    pub fn snapshot(&self) -> PatternSnapshot {
        self.store.snapshot()
    }

    /// Push a host bar type under the given index
    pub fn push<T: OHLC + ?Sized>(&mut self, index: usize, bar: &T) -> Result<()> {
        self.push_bar(Bar::from_ohlc(index, bar))
    }

    /// Accept one closed bar and run the evaluation pass.
    ///
    /// A rejected bar leaves every piece of state untouched.
    pub fn push_bar(&mut self, bar: Bar) -> Result<()> {
        if let Err(e) = self.accept(bar) {
            warn!(index = bar.index, error = %e, "rejected bar");
            return Err(e);
        }

        self.evaluate();
        Ok(())
    }

    fn accept(&mut self, bar: Bar) -> Result<()> {
        if self.config.validate_data {
            bar.validate()?;
        }
        self.series.push(bar)
    }

    /// Push a whole history, numbering bars after the last accepted one
    pub fn replay<T: OHLC>(&mut self, bars: &[T]) -> Result<()> {
        let first = self.series.last_index().map_or(0, |last| last + 1);
        for (offset, bar) in bars.iter().enumerate() {
            self.push(first + offset, bar)?;
        }
        Ok(())
    }

    /// Start a new session: drop bars, trackers and all patterns.
    ///
    /// Readers holding the store handle keep it and see it emptied.
    pub fn reset(&mut self) {
        debug!(bars = self.series.len(), "resetting session");
        self.series.clear();
        self.swings.reset();
        self.breaks.reset();
        self.store.clear();
    }

    fn evaluate(&mut self) {
        let Some(current) = self.series.current().copied() else {
            return;
        };
        trace!(index = current.index, "evaluating bar");

        let last_pivot = self.store.last_swing_point();
        if let Some(pivot) = self.swings.update(&self.series, last_pivot.as_ref()) {
            self.store.push_swing_point(pivot);
        }

        if self.config.detect_gaps {
            if let Some(gap) = self.gaps.detect(&self.series) {
                self.store.push_fair_value_gap(gap);
            }
        }

        let new_breaks = self.breaks.evaluate(&self.series, self.swings.state());
        for brk in new_breaks {
            self.store.push_structure_break(brk);
            if self.config.detect_order_blocks {
                if let Some(ob) = self.order_blocks.locate(&self.series, &brk) {
                    self.store.push_order_block(ob);
                }
            }
        }

        let series = &self.series;
        let elapsed = |start: usize| series.bars_since(start).unwrap_or(0);
        let gaps = self.store.sweep_fair_value_gaps(|gap| {
            self.gaps
                .is_mitigated_by(gap, &current, elapsed(gap.start_bar_index))
        });
        let obs = self.store.sweep_order_blocks(|ob| {
            self.order_blocks
                .is_mitigated_by(ob, &current, elapsed(ob.start_bar_index))
        });
        if gaps + obs > 0 {
            debug!(index = current.index, gaps, order_blocks = obs, "zones mitigated");
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating StructureEngine instances
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    swing_strength: usize,
    config: EngineConfig,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            swing_strength: DEFAULT_SWING_STRENGTH,
            config: EngineConfig::default(),
        }
    }

    /// Start from an existing config
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            swing_strength: config.swing_strength.get(),
            config,
        }
    }

    /// Set the pivot window half-width (validated in `build`)
    pub fn swing_strength(mut self, strength: usize) -> Self {
        self.swing_strength = strength;
        self
    }

    /// Enable/disable fair value gap detection
    pub fn detect_gaps(mut self, enable: bool) -> Self {
        self.config.detect_gaps = enable;
        self
    }

    /// Enable/disable order block detection
    pub fn detect_order_blocks(mut self, enable: bool) -> Self {
        self.config.detect_order_blocks = enable;
        self
    }

    pub fn gap_grace_bars(mut self, bars: usize) -> Self {
        self.config.gap_grace_bars = bars;
        self
    }

    pub fn order_block_grace_bars(mut self, bars: usize) -> Self {
        self.config.order_block_grace_bars = bars;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Validate and return the config without building an engine
    pub fn config(mut self) -> Result<EngineConfig> {
        self.config.swing_strength = Period::new(self.swing_strength)
            .map_err(|_| PatternError::InvalidConfig("swing_strength must be >= 1".to_string()))?;
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build the engine
    pub fn build(self) -> Result<StructureEngine> {
        StructureEngine::new(self.config()?)
    }
}

// ============================================================
// PARALLEL REPLAY
// ============================================================

use rayon::prelude::*;

/// Result of replaying a single instrument
#[derive(Debug)]
pub struct ReplayResult {
    pub symbol: String,
    pub patterns: PatternSnapshot,
}

/// Error from replaying a single instrument
#[derive(Debug)]
pub struct ReplayError {
    pub symbol: String,
    pub error: PatternError,
}

/// Replay the histories of several instruments, one engine per instrument.
///
/// Bars are numbered from 0 in slice order.
pub fn replay_parallel<'a, T, I>(
    config: &EngineConfig,
    instruments: I,
) -> (Vec<ReplayResult>, Vec<ReplayError>)
where
    T: OHLC + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            StructureEngine::new(config.clone())
                .and_then(|mut engine| {
                    engine.replay(bars)?;
                    Ok(engine.snapshot())
                })
                .map(|patterns| ReplayResult {
                    symbol: symbol.to_string(),
                    patterns,
                })
                .map_err(|error| ReplayError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(index: usize, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(index, index as i64 * 60, o, h, l, c)
    }

    /// Flat bars around 100 that never form pivots on their own
    fn flat(index: usize) -> Bar {
        bar(index, 100.0, 101.0, 99.0, 100.0)
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlc_ext() {
        let b = bar(0, 100.0, 110.0, 90.0, 105.0);
        assert!(b.overlaps(95.0, 92.0));
        assert!(b.overlaps(120.0, 110.0));
        assert!(!b.overlaps(130.0, 111.0));
    }

    #[test]
    fn test_bar_validation() {
        assert!(bar(0, 100.0, 110.0, 90.0, 105.0).validate().is_ok());
        assert_eq!(
            bar(7, 100.0, 90.0, 110.0, 105.0).validate(),
            Err(PatternError::InvalidBar {
                index: 7,
                reason: "high < low"
            })
        );
        assert!(matches!(
            bar(4, f64::NAN, 110.0, 90.0, 105.0).validate(),
            Err(PatternError::InvalidBar { index: 4, .. })
        ));
        assert!(bar(0, 100.0, f64::INFINITY, 90.0, 105.0).validate().is_err());
    }

    #[test]
    fn test_engine_builder_defaults() {
        let engine = EngineBuilder::new().build().unwrap();
        assert_eq!(engine.config().swing_strength.get(), DEFAULT_SWING_STRENGTH);
        assert_eq!(engine.config().gap_grace_bars, 2);
        assert_eq!(engine.config().order_block_grace_bars, 5);
        assert!(engine.config().detect_gaps);
        assert!(engine.config().detect_order_blocks);
    }

    #[test]
    fn test_zero_swing_strength_fails_fast() {
        let err = EngineBuilder::new().swing_strength(0).build().unwrap_err();
        assert!(matches!(err, PatternError::InvalidConfig(_)));
    }

    #[test]
    fn test_gap_grace_below_two_rejected() {
        let err = EngineBuilder::new().gap_grace_bars(1).build().unwrap_err();
        assert!(matches!(err, PatternError::InvalidConfig(_)));
    }

    #[test]
    fn test_out_of_order_bar_rejected() {
        let mut engine = EngineBuilder::new().swing_strength(1).build().unwrap();
        engine.push_bar(flat(0)).unwrap();
        engine.push_bar(flat(1)).unwrap();

        let err = engine.push_bar(flat(1)).unwrap_err();
        assert_eq!(err, PatternError::OutOfOrderBar { index: 1, last: 1 });
        let err = engine.push_bar(flat(0)).unwrap_err();
        assert_eq!(err, PatternError::OutOfOrderBar { index: 0, last: 1 });
        assert_eq!(engine.series().len(), 2);

        // The caller may correct and resubmit
        engine.push_bar(flat(2)).unwrap();
        assert_eq!(engine.series().len(), 3);
    }

    #[test]
    fn test_skipped_indices_accepted() {
        let mut engine = EngineBuilder::new().build().unwrap();
        engine.push_bar(flat(10)).unwrap();
        engine.push_bar(flat(12)).unwrap();
        engine.push_bar(flat(40)).unwrap();
        assert_eq!(engine.series().len(), 3);
        assert_eq!(engine.series().last_index(), Some(40));
    }

    #[test]
    fn test_unbounded_order_block_grace() {
        let mut engine = EngineBuilder::new()
            .swing_strength(1)
            .order_block_grace_bars(usize::MAX)
            .gap_grace_bars(usize::MAX)
            .build()
            .unwrap();
        // Pivot high at 1, break at 3, then trade back into the block
        let bars = [
            bar(0, 99.0, 100.0, 98.0, 99.0),
            bar(1, 101.0, 105.0, 100.0, 102.0),
            bar(2, 101.0, 103.0, 96.0, 97.0),
            bar(3, 98.0, 107.0, 97.0, 106.0),
            bar(4, 106.0, 108.0, 95.0, 97.0),
            bar(5, 91.0, 110.0, 85.0, 109.0),
        ];
        for b in bars {
            engine.push_bar(b).unwrap();
        }
        assert_eq!(engine.structure_breaks().len(), 1);
        let obs = engine.order_blocks();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].start_bar_index, 2);
        assert!(!obs[0].mitigated);
    }

    #[test]
    fn test_invalid_bar_rejected_with_index() {
        let mut engine = EngineBuilder::new().build().unwrap();
        let err = engine.push_bar(bar(3, 100.0, 90.0, 110.0, 100.0)).unwrap_err();
        assert_eq!(
            err,
            PatternError::InvalidBar {
                index: 3,
                reason: "high < low"
            }
        );
        assert!(engine.series().is_empty());
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let mut engine = EngineBuilder::new().validate_data(false).build().unwrap();
        assert!(engine.push_bar(bar(0, 100.0, 90.0, 110.0, 100.0)).is_ok());
    }

    #[test]
    fn test_gap_detection_toggle() {
        let bars = [
            bar(0, 99.0, 100.0, 98.0, 99.5),
            bar(1, 100.0, 112.0, 99.0, 111.0),
            bar(2, 111.0, 115.0, 110.0, 114.0),
        ];

        let mut on = EngineBuilder::new().build().unwrap();
        let mut off = EngineBuilder::new().detect_gaps(false).build().unwrap();
        for b in bars {
            on.push_bar(b).unwrap();
            off.push_bar(b).unwrap();
        }
        assert_eq!(on.fair_value_gaps().len(), 1);
        assert!(off.fair_value_gaps().is_empty());
    }

    #[test]
    fn test_reset_clears_session() {
        let mut engine = EngineBuilder::new().swing_strength(1).build().unwrap();
        let store = engine.store();
        for (i, h) in [1.0, 3.0, 1.0].iter().enumerate() {
            engine.push_bar(bar(i, h - 0.5, *h, h - 1.0, h - 0.2)).unwrap();
        }
        assert_eq!(store.swing_points().len(), 1);

        engine.reset();
        assert!(engine.series().is_empty());
        assert_eq!(engine.swing_state(), SwingState::default());
        assert!(store.swing_points().is_empty());

        // A new session may start at any index
        engine.push_bar(flat(500)).unwrap();
        assert_eq!(engine.series().first_index(), Some(500));
    }

    #[test]
    fn test_replay_continues_numbering() {
        let mut engine = EngineBuilder::new().build().unwrap();
        engine.replay(&[flat(0), flat(0)]).unwrap();
        engine.replay(&[flat(0)]).unwrap();
        assert_eq!(engine.series().last_index(), Some(2));
    }

    #[test]
    fn test_parallel_replay() {
        let config = EngineConfig {
            swing_strength: Period::new(2).unwrap(),
            ..EngineConfig::default()
        };
        let up: Vec<Bar> = (0..30)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.7).sin() * 10.0;
                bar(i, base, base + 2.0, base - 2.0, base + 0.5)
            })
            .collect();
        let down: Vec<Bar> = up.iter().rev().copied().collect();

        let instruments: Vec<(&str, &[Bar])> = vec![("EURUSD", &up[..]), ("GBPUSD", &down[..])];
        let (results, errors) = replay_parallel(&config, instruments);
        assert_eq!(results.len(), 2);
        assert!(errors.is_empty());

        let mut sequential = StructureEngine::new(config.clone()).unwrap();
        sequential.replay(&up).unwrap();
        let eur = results.iter().find(|r| r.symbol == "EURUSD").unwrap();
        assert_eq!(eur.patterns, sequential.snapshot());
    }

    #[test]
    fn test_parallel_replay_reports_errors() {
        let config = EngineConfig::default();
        let good = vec![flat(0), flat(1)];
        let bad = vec![flat(0), bar(1, 100.0, f64::NAN, 99.0, 100.0)];
        let instruments: Vec<(&str, &[Bar])> = vec![("GOOD", &good[..]), ("BAD", &bad[..])];

        let (results, errors) = replay_parallel(&config, instruments);
        assert_eq!(results.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BAD");
        assert!(matches!(errors[0].error, PatternError::InvalidBar { index: 1, .. }));
    }

    #[test]
    fn test_labels() {
        assert_eq!(BreakLabel::Bos.as_str(), "BOS");
        assert_eq!(SwingKind::High.as_str(), "PH");
        assert_eq!(SwingKind::Low.as_str(), "PL");
    }
}

//! Break-of-structure detection
//!
//! A bullish break fires on the first bar that trades and closes above the
//! last confirmed pivot high after the previous bar closed at or below it.
//! Bearish breaks mirror this against the last pivot low. Each pivot can be
//! broken at most once per direction.

use tracing::debug;

use crate::{series::BarSeries, Bar, BreakLabel, Direction, StructureBreak};

use super::SwingState;

/// Confirms closes through the last pivot levels
#[derive(Debug, Clone, Default)]
pub struct StructureBreakDetector {
  broken_high: Option<usize>,
  broken_low: Option<usize>,
}

/// Whether `current` closes through `level` coming from the other side
#[inline]
pub fn closes_through(direction: Direction, level: f64, current: &Bar, previous: &Bar) -> bool {
  match direction {
    Direction::Bullish => current.high > level && current.close > level && previous.close <= level,
    Direction::Bearish => current.low < level && current.close < level && previous.close >= level,
  }
}

impl StructureBreakDetector {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn min_bars(&self) -> usize {
    2
  }

  /// Pivot bars already broken upward / downward
  pub fn broken(&self) -> (Option<usize>, Option<usize>) {
    (self.broken_high, self.broken_low)
  }

  /// Check the current bar against the last pivots, bullish first.
  ///
  /// Both directions are checked independently. They cannot both fire on one
  /// bar: that would need the previous close at or below the high level and at
  /// or above the low level while the current close sits above the first and
  /// below the second.
  pub fn evaluate(&mut self, series: &BarSeries, swings: &SwingState) -> Vec<StructureBreak> {
    let mut breaks = Vec::new();
    if series.len() < self.min_bars() {
      return breaks;
    }
    let (Some(current), Some(previous)) = (series.back(0), series.back(1)) else {
      return breaks;
    };

    if let Some(brk) = Self::check(
      series,
      Direction::Bullish,
      swings.last_high,
      &mut self.broken_high,
      current,
      previous,
    ) {
      breaks.push(brk);
    }
    if let Some(brk) = Self::check(
      series,
      Direction::Bearish,
      swings.last_low,
      &mut self.broken_low,
      current,
      previous,
    ) {
      breaks.push(brk);
    }
    breaks
  }

  fn check(
    series: &BarSeries,
    direction: Direction,
    pivot: Option<usize>,
    broken: &mut Option<usize>,
    current: &Bar,
    previous: &Bar,
  ) -> Option<StructureBreak> {
    let pivot = pivot?;
    if *broken == Some(pivot) || pivot >= current.index {
      return None;
    }
    let pivot_bar = series.get(pivot)?;
    let level = match direction {
      Direction::Bullish => pivot_bar.high,
      Direction::Bearish => pivot_bar.low,
    };
    if !closes_through(direction, level, current, previous) {
      return None;
    }

    *broken = Some(pivot);
    debug!(pivot, bar = current.index, level, direction = ?direction, "structure break");
    Some(StructureBreak {
      start_bar_index: pivot,
      end_bar_index: current.index,
      price_level: level,
      direction,
      label: BreakLabel::Bos,
    })
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }
}

//! Order block location
//!
//! When a structure break is confirmed, the order block is the extreme bar of
//! the leg that produced it: the lowest-low bar since the broken pivot for a
//! bullish break, the highest-high bar for a bearish one. The search covers
//! the bars after the pivot up to and including the breaking bar, so it costs
//! O(distance to the pivot) per break.

use tracing::debug;

use crate::{series::BarSeries, Bar, Direction, OrderBlock, StructureBreak};

use super::{
  helpers::{highest_high, lowest_low},
  MitigationRule,
};

/// Locates order blocks behind new structure breaks and decides their mitigation
#[derive(Debug, Clone)]
pub struct OrderBlockLocator {
  grace_bars: usize,
}

impl Default for OrderBlockLocator {
  fn default() -> Self {
    Self { grace_bars: crate::DEFAULT_ORDER_BLOCK_GRACE_BARS }
  }
}

impl OrderBlockLocator {
  pub fn new(grace_bars: usize) -> Self {
    Self { grace_bars }
  }

  pub fn with_defaults() -> Self {
    Self::default()
  }

  /// Find the order block behind `brk`.
  ///
  /// Only breaks confirmed on the current bar are searched. An empty range
  /// (a break whose start and end are the same bar) yields nothing.
  pub fn locate(&self, series: &BarSeries, brk: &StructureBreak) -> Option<OrderBlock> {
    let current = series.current()?;
    if brk.end_bar_index != current.index || brk.end_bar_index <= brk.start_bar_index {
      return None;
    }

    let leg = series.range(brk.start_bar_index + 1, brk.end_bar_index);
    let origin = match brk.direction {
      Direction::Bullish => lowest_low(leg)?,
      Direction::Bearish => highest_high(leg)?,
    };

    let ob = OrderBlock {
      top: origin.high,
      bottom: origin.low,
      start_bar_index: origin.index,
      direction: brk.direction,
      mitigated: false,
    };
    debug!(
      bar = ob.start_bar_index,
      top = ob.top,
      bottom = ob.bottom,
      direction = ?ob.direction,
      "order block"
    );
    Some(ob)
  }
}

impl MitigationRule for OrderBlockLocator {
  type Zone = OrderBlock;

  fn grace_bars(&self) -> usize {
    self.grace_bars
  }

  /// Bullish blocks are revisited from above, bearish ones from below
  fn touches(&self, ob: &OrderBlock, bar: &Bar) -> bool {
    match ob.direction {
      Direction::Bullish => bar.low <= ob.top,
      Direction::Bearish => bar.high >= ob.bottom,
    }
  }
}

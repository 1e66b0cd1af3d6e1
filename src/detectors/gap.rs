//! Fair value gap detection
//!
//! A gap is confirmed on bar `n` when the wicks of bars `n-2` and `n` do not
//! overlap, leaving the middle (displacement) bar's range partly unfilled.
//! It is mitigated by the first later bar whose range reaches back into it.

use tracing::debug;

use crate::{series::BarSeries, Bar, Direction, FairValueGap, OHLCExt};

use super::MitigationRule;

/// Detects 3-bar gaps and decides their mitigation
#[derive(Debug, Clone)]
pub struct GapTracker {
  grace_bars: usize,
}

impl Default for GapTracker {
  fn default() -> Self {
    Self { grace_bars: crate::DEFAULT_GAP_GRACE_BARS }
  }
}

impl GapTracker {
  pub fn new(grace_bars: usize) -> Self {
    Self { grace_bars }
  }

  pub fn with_defaults() -> Self {
    Self::default()
  }

  #[inline]
  pub fn min_bars(&self) -> usize {
    3
  }

  /// Test the last three bars for a gap
  pub fn detect(&self, series: &BarSeries) -> Option<FairValueGap> {
    if series.len() < self.min_bars() {
      return None;
    }
    let first = series.back(2)?;
    let third = series.back(0)?;

    let gap = if third.low > first.high {
      FairValueGap {
        top: third.low,
        bottom: first.high,
        start_bar_index: first.index,
        direction: Direction::Bullish,
        mitigated: false,
      }
    } else if third.high < first.low {
      FairValueGap {
        top: first.low,
        bottom: third.high,
        start_bar_index: first.index,
        direction: Direction::Bearish,
        mitigated: false,
      }
    } else {
      return None;
    };

    debug!(
      bar = gap.start_bar_index,
      top = gap.top,
      bottom = gap.bottom,
      direction = ?gap.direction,
      "fair value gap"
    );
    Some(gap)
  }
}

impl MitigationRule for GapTracker {
  type Zone = FairValueGap;

  fn grace_bars(&self) -> usize {
    self.grace_bars
  }

  /// Any overlap with the gap box fills it, regardless of direction
  fn touches(&self, gap: &FairValueGap, bar: &Bar) -> bool {
    bar.overlaps(gap.top, gap.bottom)
  }
}

//! Window scans shared across detectors

use crate::Bar;

/// True if `value` is strictly greater than `key` of every bar in `neighbors`
#[inline]
pub fn strictly_above(value: f64, neighbors: &[Bar], key: impl Fn(&Bar) -> f64) -> bool {
  neighbors.iter().all(|b| value > key(b))
}

/// True if `value` is strictly less than `key` of every bar in `neighbors`
#[inline]
pub fn strictly_below(value: f64, neighbors: &[Bar], key: impl Fn(&Bar) -> f64) -> bool {
  neighbors.iter().all(|b| value < key(b))
}

/// Bar with the lowest low, scanning from the newest bar backwards.
/// On ties the newest bar wins.
pub fn lowest_low(bars: &[Bar]) -> Option<&Bar> {
  let mut best: Option<&Bar> = None;
  for b in bars.iter().rev() {
    if best.map_or(true, |m| b.low < m.low) {
      best = Some(b);
    }
  }
  best
}

/// Bar with the highest high, scanning from the newest bar backwards.
/// On ties the newest bar wins.
pub fn highest_high(bars: &[Bar]) -> Option<&Bar> {
  let mut best: Option<&Bar> = None;
  for b in bars.iter().rev() {
    if best.map_or(true, |m| b.high > m.high) {
      best = Some(b);
    }
  }
  best
}

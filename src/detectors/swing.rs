//! Swing pivot detection
//!
//! On each bar `n` the detector looks at exactly one candidate, the bar
//! `strength` positions back. The candidate is a pivot high if its high is
//! strictly above the highs of the `strength` bars on each side, and a pivot
//! low if its low is strictly below their lows.

use tracing::{debug, trace, warn};

use crate::{series::BarSeries, Period, SwingKind, SwingPoint};

use super::helpers::{strictly_above, strictly_below};

/// Last confirmed pivot bars, consumed by the structure break detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SwingState {
  pub last_high: Option<usize>,
  pub last_low: Option<usize>,
}

/// Pivot high/low classifier over a symmetric window
#[derive(Debug, Clone)]
pub struct SwingDetector {
  strength: Period,
  state: SwingState,
}

impl SwingDetector {
  pub fn new(strength: Period) -> Self {
    Self { strength, state: SwingState::default() }
  }

  #[inline]
  pub fn strength(&self) -> usize {
    self.strength.get()
  }

  /// Bars needed before the first candidate can be judged
  #[inline]
  pub fn min_bars(&self) -> usize {
    2 * self.strength() + 1
  }

  #[inline]
  pub fn state(&self) -> &SwingState {
    &self.state
  }

  /// Classify the candidate bar without touching any state.
  ///
  /// A bar that passes both tests (an outside bar engulfing the whole window)
  /// is ambiguous and yields nothing.
  pub fn classify(&self, series: &BarSeries) -> Option<SwingPoint> {
    let strength = self.strength();
    let bars = series.as_slice();
    if bars.len() < self.min_bars() {
      return None;
    }

    let c = bars.len() - 1 - strength;
    let candidate = &bars[c];
    let left = &bars[c - strength..c];
    let right = &bars[c + 1..];

    let is_high = strictly_above(candidate.high, left, |b| b.high)
      && strictly_above(candidate.high, right, |b| b.high);
    let is_low = strictly_below(candidate.low, left, |b| b.low)
      && strictly_below(candidate.low, right, |b| b.low);

    match (is_high, is_low) {
      (true, true) => {
        warn!(bar = candidate.index, "bar is both pivot high and pivot low; skipped");
        None
      },
      (true, false) => Some(SwingPoint {
        price: candidate.high,
        bar_index: candidate.index,
        kind: SwingKind::High,
      }),
      (false, true) => Some(SwingPoint {
        price: candidate.low,
        bar_index: candidate.index,
        kind: SwingKind::Low,
      }),
      (false, false) => None,
    }
  }

  /// Classify the candidate and, if it is a new pivot, record it as the last
  /// confirmed high or low.
  ///
  /// `previous` is the most recently stored pivot; a candidate with the same
  /// bar and kind is a repeat evaluation and is dropped.
  pub fn update(&mut self, series: &BarSeries, previous: Option<&SwingPoint>) -> Option<SwingPoint> {
    let pivot = self.classify(series)?;

    if previous.is_some_and(|p| p.bar_index == pivot.bar_index && p.kind == pivot.kind) {
      trace!(bar = pivot.bar_index, kind = pivot.kind.as_str(), "pivot already recorded");
      return None;
    }

    match pivot.kind {
      SwingKind::High => self.state.last_high = Some(pivot.bar_index),
      SwingKind::Low => self.state.last_low = Some(pivot.bar_index),
    }
    debug!(bar = pivot.bar_index, price = pivot.price, kind = pivot.kind.as_str(), "swing pivot");
    Some(pivot)
  }

  pub fn reset(&mut self) {
    self.state = SwingState::default();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Bar;

  /// Bars whose high is `h` and low is `h - 1`
  fn series_from_highs(first: usize, highs: &[f64]) -> Vec<Bar> {
    highs
      .iter()
      .enumerate()
      .map(|(i, &h)| Bar::new(first + i, 0, h - 0.5, h, h - 1.0, h - 0.5))
      .collect()
  }

  fn detector(strength: usize) -> SwingDetector {
    SwingDetector::new(Period::new(strength).unwrap())
  }

  /// Feed bars one by one, collecting what `update` emits
  fn run(det: &mut SwingDetector, bars: &[Bar]) -> Vec<(usize, SwingPoint)> {
    let mut series = BarSeries::new();
    let mut out: Vec<(usize, SwingPoint)> = Vec::new();
    for bar in bars {
      series.push(*bar).unwrap();
      let last = out.last().map(|(_, p)| *p);
      if let Some(p) = det.update(&series, last.as_ref()) {
        out.push((bar.index, p));
      }
    }
    out
  }

  #[test]
  fn test_pivot_high_confirmed_after_right_window() {
    let mut det = detector(2);
    let bars = series_from_highs(0, &[1.0, 2.0, 5.0, 2.0, 1.0]);

    // Nothing until bar 4 closes
    let early = run(&mut detector(2), &bars[..4]);
    assert!(early.is_empty());

    let found = run(&mut det, &bars);
    assert_eq!(found.len(), 1);
    let (emitted_at, pivot) = found[0];
    assert_eq!(emitted_at, 4);
    assert_eq!(pivot.bar_index, 2);
    assert_eq!(pivot.kind, SwingKind::High);
    assert_eq!(pivot.price, 5.0);
    assert_eq!(det.state().last_high, Some(2));
    assert_eq!(det.state().last_low, None);
  }

  #[test]
  fn test_pivot_low() {
    let mut det = detector(2);
    let bars = series_from_highs(0, &[9.0, 8.0, 3.0, 8.0, 9.0]);
    let found = run(&mut det, &bars);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1.kind, SwingKind::Low);
    assert_eq!(found[0].1.price, 2.0);
    assert_eq!(det.state().last_low, Some(2));
  }

  #[test]
  fn test_equal_neighbor_is_not_a_pivot() {
    let mut det = detector(2);
    let bars = series_from_highs(0, &[1.0, 5.0, 5.0, 2.0, 1.0]);
    assert!(run(&mut det, &bars).is_empty());
  }

  #[test]
  fn test_only_candidate_at_strength_back_is_judged() {
    // Bar 1 is a pivot for strength 1 but is never re-examined by strength 2
    let mut det = detector(2);
    let bars = series_from_highs(0, &[1.0, 3.0, 2.0, 2.5, 2.0, 1.0]);
    let found = run(&mut det, &bars);
    assert!(found.iter().all(|(_, p)| p.bar_index != 1));
  }

  #[test]
  fn test_outside_bar_yields_nothing() {
    let mut series = BarSeries::new();
    series.push(Bar::new(0, 0, 10.0, 11.0, 9.0, 10.0)).unwrap();
    series.push(Bar::new(1, 0, 10.0, 15.0, 5.0, 10.0)).unwrap();
    series.push(Bar::new(2, 0, 10.0, 11.0, 9.0, 10.0)).unwrap();

    let mut det = detector(1);
    assert!(det.classify(&series).is_none());
    assert!(det.update(&series, None).is_none());
    assert_eq!(*det.state(), SwingState::default());
  }

  #[test]
  fn test_repeat_evaluation_is_deduplicated() {
    let mut series = BarSeries::new();
    for bar in series_from_highs(0, &[1.0, 3.0, 1.0]) {
      series.push(bar).unwrap();
    }
    let mut det = detector(1);
    let first = det.update(&series, None).unwrap();
    assert!(det.update(&series, Some(&first)).is_none());

    // A different kind at the same bar is not a repeat
    let other = SwingPoint { kind: SwingKind::Low, ..first };
    assert!(det.update(&series, Some(&other)).is_some());
  }

  #[test]
  fn test_session_offset_indices() {
    let mut det = detector(1);
    let bars = series_from_highs(1000, &[1.0, 3.0, 1.0, 0.5, 2.0]);
    let found = run(&mut det, &bars);
    let idx: Vec<usize> = found.iter().map(|(_, p)| p.bar_index).collect();
    assert_eq!(idx, vec![1001, 1003]);
    assert_eq!(det.state().last_high, Some(1001));
    assert_eq!(det.state().last_low, Some(1003));
  }

  #[test]
  fn test_reset() {
    let mut det = detector(1);
    run(&mut det, &series_from_highs(0, &[1.0, 3.0, 1.0]));
    det.reset();
    assert_eq!(*det.state(), SwingState::default());
  }
}

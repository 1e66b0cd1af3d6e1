//! Append-only bar history
//!
//! Indices only have to increase, so they may skip. Look-backs like "two bars
//! ago" count positions in the backing `Vec`; lookups by host index binary
//! search it.

use crate::{Bar, PatternError, Result};

/// Read-only, append-only indexed view over closed bars
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
  bars: Vec<Bar>,
}

impl BarSeries {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.bars.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.bars.is_empty()
  }

  /// Index of the session's first bar
  #[inline]
  pub fn first_index(&self) -> Option<usize> {
    self.bars.first().map(|b| b.index)
  }

  /// Index of the most recently accepted bar
  #[inline]
  pub fn last_index(&self) -> Option<usize> {
    self.bars.last().map(|b| b.index)
  }

  /// The bar being evaluated (the last one pushed)
  #[inline]
  pub fn current(&self) -> Option<&Bar> {
    self.bars.last()
  }

  /// Position of the bar with host index `index`
  #[inline]
  pub fn position(&self, index: usize) -> Option<usize> {
    self.bars.binary_search_by_key(&index, |b| b.index).ok()
  }

  /// Bar by host index
  #[inline]
  pub fn get(&self, index: usize) -> Option<&Bar> {
    self.position(index).map(|pos| &self.bars[pos])
  }

  /// Bars closed after bar `index`, up to and including the current one
  pub fn bars_since(&self, index: usize) -> Option<usize> {
    let pos = self.position(index)?;
    Some(self.bars.len() - 1 - pos)
  }

  /// Bar `offset` bars before the current one (`0` is the current bar)
  #[inline]
  pub fn back(&self, offset: usize) -> Option<&Bar> {
    let pos = self.bars.len().checked_sub(offset + 1)?;
    self.bars.get(pos)
  }

  /// Bars with host indices in `from..=to`, clamped to what is available
  pub fn range(&self, from: usize, to: usize) -> &[Bar] {
    let start = self.bars.partition_point(|b| b.index < from);
    let end = self.bars.partition_point(|b| b.index <= to);
    if start >= end {
      return &[];
    }
    &self.bars[start..end]
  }

  pub fn as_slice(&self) -> &[Bar] {
    &self.bars
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
    self.bars.iter()
  }

  /// Append a bar. Rejects indices that repeat or go backwards.
  pub(crate) fn push(&mut self, bar: Bar) -> Result<()> {
    if let Some(last) = self.last_index() {
      if bar.index <= last {
        return Err(PatternError::OutOfOrderBar { index: bar.index, last });
      }
    }
    self.bars.push(bar);
    Ok(())
  }

  pub(crate) fn clear(&mut self) {
    self.bars.clear();
  }
}

impl<'a> IntoIterator for &'a BarSeries {
  type Item = &'a Bar;
  type IntoIter = std::slice::Iter<'a, Bar>;

  fn into_iter(self) -> Self::IntoIter {
    self.bars.iter()
  }
}

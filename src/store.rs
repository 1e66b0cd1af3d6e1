//! Pattern collections shared between the engine and its readers
//!
//! Every collection sits behind its own reader-writer lock. The engine takes
//! the write side only to append one entity or to run a mitigation sweep;
//! readers get cloned snapshots, so they never see a half-written entry.

use parking_lot::RwLock;
use tracing::debug;

use crate::{FairValueGap, OrderBlock, StructureBreak, SwingPoint, Zone};

// ============================================================
// GUARDED COLLECTION
// ============================================================

/// Append-only `Vec` behind a single-writer/multi-reader lock
#[derive(Debug)]
pub struct Guarded<T> {
  inner: RwLock<Vec<T>>,
}

impl<T> Default for Guarded<T> {
  fn default() -> Self {
    Self { inner: RwLock::new(Vec::new()) }
  }
}

impl<T: Clone> Guarded<T> {
  /// Copy of the current contents
  pub fn snapshot(&self) -> Vec<T> {
    self.inner.read().clone()
  }

  /// Run `f` against the contents without copying them
  pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
    f(&self.inner.read())
  }

  pub fn len(&self) -> usize {
    self.inner.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.read().is_empty()
  }

  fn last(&self) -> Option<T> {
    self.inner.read().last().cloned()
  }

  fn push(&self, item: T) {
    self.inner.write().push(item);
  }

  fn retain(&self, keep: impl FnMut(&T) -> bool) -> usize {
    let mut items = self.inner.write();
    let before = items.len();
    items.retain(keep);
    before - items.len()
  }

  fn clear(&self) {
    self.inner.write().clear();
  }
}

impl<Z: Zone + Clone> Guarded<Z> {
  /// Visit every unmitigated zone, oldest first, and mitigate those `hit` selects.
  /// Returns how many flipped.
  fn sweep(&self, mut hit: impl FnMut(&Z) -> bool) -> usize {
    let mut zones = self.inner.write();
    let mut flipped = 0;
    for zone in zones.iter_mut().filter(|z| !z.is_mitigated()) {
      if hit(zone) {
        zone.mark_mitigated();
        flipped += 1;
      }
    }
    flipped
  }
}

// ============================================================
// PATTERN STORE
// ============================================================

/// Owner of every emitted pattern
#[derive(Debug, Default)]
pub struct PatternStore {
  swing_points: Guarded<SwingPoint>,
  fair_value_gaps: Guarded<FairValueGap>,
  structure_breaks: Guarded<StructureBreak>,
  order_blocks: Guarded<OrderBlock>,
}

/// Point-in-time copy of all four collections
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PatternSnapshot {
  pub swing_points: Vec<SwingPoint>,
  pub fair_value_gaps: Vec<FairValueGap>,
  pub structure_breaks: Vec<StructureBreak>,
  pub order_blocks: Vec<OrderBlock>,
}

impl PatternSnapshot {
  pub fn is_empty(&self) -> bool {
    self.swing_points.is_empty()
      && self.fair_value_gaps.is_empty()
      && self.structure_breaks.is_empty()
      && self.order_blocks.is_empty()
  }
}

impl PatternStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn swing_points(&self) -> Vec<SwingPoint> {
    self.swing_points.snapshot()
  }

  pub fn fair_value_gaps(&self) -> Vec<FairValueGap> {
    self.fair_value_gaps.snapshot()
  }

  pub fn structure_breaks(&self) -> Vec<StructureBreak> {
    self.structure_breaks.snapshot()
  }

  pub fn order_blocks(&self) -> Vec<OrderBlock> {
    self.order_blocks.snapshot()
  }

  /// Raw guarded collections, for zero-copy reads via [`Guarded::read`]
  pub fn swing_points_guard(&self) -> &Guarded<SwingPoint> {
    &self.swing_points
  }

  pub fn fair_value_gaps_guard(&self) -> &Guarded<FairValueGap> {
    &self.fair_value_gaps
  }

  pub fn structure_breaks_guard(&self) -> &Guarded<StructureBreak> {
    &self.structure_breaks
  }

  pub fn order_blocks_guard(&self) -> &Guarded<OrderBlock> {
    &self.order_blocks
  }

  /// All four collections.
  ///
  /// Each collection is copied under its own lock; take the snapshot between
  /// bars for a view that is consistent across collections.
  pub fn snapshot(&self) -> PatternSnapshot {
    PatternSnapshot {
      swing_points: self.swing_points(),
      fair_value_gaps: self.fair_value_gaps(),
      structure_breaks: self.structure_breaks(),
      order_blocks: self.order_blocks(),
    }
  }

  /// Patterns that intersect the visible bar window `from..=to`.
  ///
  /// Pivots must sit inside the window, breaks must overlap it, and zones are
  /// drawn from their start bar to the right edge so any zone starting at or
  /// before `to` is included.
  pub fn visible(&self, from: usize, to: usize) -> PatternSnapshot {
    PatternSnapshot {
      swing_points: self.swing_points.read(|items| {
        items.iter().filter(|p| (from..=to).contains(&p.bar_index)).copied().collect()
      }),
      fair_value_gaps: self.fair_value_gaps.read(|items| {
        items.iter().filter(|g| g.start_bar_index <= to).copied().collect()
      }),
      structure_breaks: self.structure_breaks.read(|items| {
        items
          .iter()
          .filter(|b| b.start_bar_index <= to && b.end_bar_index >= from)
          .copied()
          .collect()
      }),
      order_blocks: self.order_blocks.read(|items| {
        items.iter().filter(|ob| ob.start_bar_index <= to).copied().collect()
      }),
    }
  }

  pub(crate) fn last_swing_point(&self) -> Option<SwingPoint> {
    self.swing_points.last()
  }

  pub(crate) fn push_swing_point(&self, pivot: SwingPoint) {
    self.swing_points.push(pivot);
  }

  pub(crate) fn push_fair_value_gap(&self, gap: FairValueGap) {
    self.fair_value_gaps.push(gap);
  }

  pub(crate) fn push_structure_break(&self, brk: StructureBreak) {
    self.structure_breaks.push(brk);
  }

  pub(crate) fn push_order_block(&self, ob: OrderBlock) {
    self.order_blocks.push(ob);
  }

  pub(crate) fn sweep_fair_value_gaps(&self, hit: impl FnMut(&FairValueGap) -> bool) -> usize {
    self.fair_value_gaps.sweep(hit)
  }

  pub(crate) fn sweep_order_blocks(&self, hit: impl FnMut(&OrderBlock) -> bool) -> usize {
    self.order_blocks.sweep(hit)
  }

  pub(crate) fn clear(&self) {
    self.swing_points.clear();
    self.fair_value_gaps.clear();
    self.structure_breaks.clear();
    self.order_blocks.clear();
  }
}

// ============================================================
// RETENTION
// ============================================================

/// Pruning of old mitigated zones, applied by the host when it chooses.
///
/// Detection never prunes. Unmitigated zones, pivots and breaks are always
/// kept: the mitigation sweeps and the pivot de-duplication depend on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetentionPolicy {
  /// Mitigated zones starting more than this many bars before the current bar are dropped
  pub keep_bars: usize,
}

/// How many entries a prune removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
  pub fair_value_gaps: usize,
  pub order_blocks: usize,
}

impl RetentionPolicy {
  pub fn new(keep_bars: usize) -> Self {
    Self { keep_bars }
  }

  pub fn apply(&self, store: &PatternStore, current_index: usize) -> PruneReport {
    let cutoff = current_index.saturating_sub(self.keep_bars);
    let keep = |zone: &dyn Zone| !zone.is_mitigated() || zone.start_bar_index() >= cutoff;

    let report = PruneReport {
      fair_value_gaps: store.fair_value_gaps.retain(|g| keep(g)),
      order_blocks: store.order_blocks.retain(|ob| keep(ob)),
    };
    if report.fair_value_gaps + report.order_blocks > 0 {
      debug!(
        cutoff,
        gaps = report.fair_value_gaps,
        order_blocks = report.order_blocks,
        "pruned mitigated zones"
      );
    }
    report
  }
}

//! Structure detectors
//!
//! Each detector is evaluated once per closed bar, in this order:
//!
//! - **Swing**: pivot highs/lows over a symmetric `2·strength+1` window
//! - **Gap**: 3-bar fair value gaps
//! - **Structure**: closes through the last confirmed pivot (BOS)
//! - **Order block**: the extreme bar of the leg behind each new break
//!
//! Gaps and order blocks are [`Zone`](crate::Zone)s; their detectors also
//! implement [`MitigationRule`], which the engine sweeps after detection.

pub mod helpers;

pub mod gap;
pub mod order_block;
pub mod structure;
pub mod swing;

pub use gap::*;
pub use helpers::*;
pub use order_block::*;
pub use structure::*;
pub use swing::*;

use crate::{Bar, Zone};

/// When a later bar mitigates a zone
pub trait MitigationRule {
  type Zone: Zone;

  /// Bars after the zone's start bar during which it cannot be mitigated
  fn grace_bars(&self) -> usize;

  /// Whether `bar` reaches into the zone
  fn touches(&self, zone: &Self::Zone, bar: &Bar) -> bool;

  /// Unmitigated, past its grace period and touched by `bar`.
  ///
  /// `elapsed` is the number of bars closed after the zone's start bar, up
  /// to and including `bar`.
  #[inline]
  fn is_mitigated_by(&self, zone: &Self::Zone, bar: &Bar, elapsed: usize) -> bool {
    !zone.is_mitigated() && elapsed > self.grace_bars() && self.touches(zone, bar)
  }
}

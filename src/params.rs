//! Parameter metadata for the engine configuration
//!
//! This module describes the tunable values of [`EngineConfig`], enabling:
//! - Grid search optimization
//! - Parameter documentation
//! - Automatic configuration UI generation
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use ict_structure::params::{ParamMeta, ParameterizedConfig};
//! use ict_structure::prelude::*;
//!
//! for param in EngineConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let config = EngineConfig::with_params(&HashMap::from([("swing_strength", 3.0)])).unwrap();
//! assert_eq!(config.swing_strength.get(), 3);
//! ```

use std::collections::HashMap;

use crate::{EngineConfig, PatternError, Period, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Positive integer
  Period,
  /// Non-negative integer bar count
  Count,
  /// On/off switch encoded as 0.0 / 1.0
  Flag,
}

/// Metadata for a single configuration parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "swing_strength")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Period parameter
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// Create a new ParamMeta for a bar-count parameter
  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  /// Create a new ParamMeta for an on/off parameter
  pub const fn flag(name: &'static str, default: bool, description: &'static str) -> Self {
    Self {
      name,
      param_type: ParamType::Flag,
      default: if default { 1.0 } else { 0.0 },
      range: (0.0, 1.0, 1.0),
      description,
    }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    if value.fract() != 0.0 {
      return Err(PatternError::InvalidValue(match self.param_type {
        ParamType::Period => "Period must be a positive integer",
        ParamType::Count => "Count must be a non-negative integer",
        ParamType::Flag => "Flag must be 0 or 1",
      }));
    }
    Ok(())
  }
}

// ============================================================
// PARAMETERIZED CONFIG TRAIT
// ============================================================

/// Trait for configurations that support parameterization
pub trait ParameterizedConfig: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a configuration from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

const ENGINE_PARAMS: &[ParamMeta] = &[
  ParamMeta::period(
    "swing_strength",
    crate::DEFAULT_SWING_STRENGTH as f64,
    (1.0, 100.0, 1.0),
    "Number of bars to the left and right of a swing high/low",
  ),
  ParamMeta::flag("detect_gaps", true, "Detect fair value gaps"),
  ParamMeta::flag("detect_order_blocks", true, "Detect order blocks behind structure breaks"),
  ParamMeta::count(
    "order_block_grace_bars",
    crate::DEFAULT_ORDER_BLOCK_GRACE_BARS as f64,
    (0.0, 50.0, 1.0),
    "Bars after an order block forms before it can be mitigated",
  ),
  ParamMeta::count(
    "gap_grace_bars",
    crate::DEFAULT_GAP_GRACE_BARS as f64,
    (2.0, 20.0, 1.0),
    "Bars after a gap's first bar before it can be mitigated",
  ),
];

impl ParameterizedConfig for EngineConfig {
  fn param_meta() -> &'static [ParamMeta] {
    ENGINE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    if let Some(unknown) = params.keys().find(|k| !ENGINE_PARAMS.iter().any(|m| m.name == **k)) {
      return Err(PatternError::InvalidConfig(format!("unknown parameter: {unknown}")));
    }

    let value = |name: &str| -> Result<f64> {
      let meta = ENGINE_PARAMS
        .iter()
        .find(|m| m.name == name)
        .ok_or_else(|| PatternError::InvalidConfig(format!("unknown parameter: {name}")))?;
      let v = params.get(name).copied().unwrap_or(meta.default);
      meta.validate(v)?;
      Ok(v)
    };

    let config = EngineConfig {
      swing_strength: get_period(value("swing_strength")?)?,
      detect_gaps: value("detect_gaps")? != 0.0,
      detect_order_blocks: value("detect_order_blocks")? != 0.0,
      order_block_grace_bars: value("order_block_grace_bars")? as usize,
      gap_grace_bars: value("gap_grace_bars")? as usize,
      ..EngineConfig::default()
    };
    config.validate()?;
    Ok(config)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Convert a validated parameter value to a Period
pub fn get_period(value: f64) -> Result<Period> {
  Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================

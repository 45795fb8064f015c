//! Reduction configuration.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Knobs of the reduction engine.
///
/// Loaded from JSON by the embedding application; every field has a
/// default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Upper bound on reduction passes. Reaching it is reported, not fatal.
    /// Default: 32.
    pub max_passes: u32,

    /// Grade changes at or below this count as "no change".
    /// Default: 1e-6.
    pub grade_epsilon: f64,

    /// Add exclusions between candidates built on the same glyph before
    /// reducing. Default: true.
    pub materialize_glyph_exclusions: bool,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            max_passes: 32,
            grade_epsilon: 1e-6,
            materialize_glyph_exclusions: true,
        }
    }
}

impl ReductionConfig {
    /// Parse a JSON object. Other JSON values, arrays included, are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(Error::InvalidConfig(format!("expected a JSON object, got {value}")));
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_passes == 0 {
            return Err(Error::InvalidConfig("max_passes must be at least 1".into()));
        }
        if !self.grade_epsilon.is_finite() || self.grade_epsilon < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "grade_epsilon must be finite and >= 0, got {}",
                self.grade_epsilon
            )));
        }
        Ok(())
    }
}

//! Tunables for the pipelines.

use agro_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Every field has a default, so an empty config section is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Cohorts smaller than this get the conservative interval.
  pub min_cohort_samples:        usize,
  /// Multiplier on the residual spread for the interval half-width.
  pub interval_z:                f64,
  /// Conservative half-width as a fraction of the point estimate.
  pub default_interval_fraction: f64,
  /// Lower bound on the conservative interval's full width, t/ha.
  pub min_interval_width:        f64,
  /// Confidence stays below this whenever the conservative path is taken.
  pub low_confidence_ceiling:    f64,
  pub max_model_confidence:      f64,
  pub classifier_top_k:          usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      min_cohort_samples:        5,
      interval_z:                1.96,
      default_interval_fraction: 0.25,
      min_interval_width:        0.5,
      low_confidence_ceiling:    0.5,
      max_model_confidence:      0.95,
      classifier_top_k:          5,
    }
  }
}

impl EngineConfig {
  pub fn validate(&self) -> Result<()> {
    let unit = |name: &str, v: f64| {
      if (0.0..=1.0).contains(&v) {
        Ok(())
      } else {
        Err(Error::InvalidInput(format!("{name} must be within 0..=1, got {v}")))
      }
    };
    unit("low_confidence_ceiling", self.low_confidence_ceiling)?;
    unit("max_model_confidence", self.max_model_confidence)?;
    if self.low_confidence_ceiling > self.max_model_confidence {
      return Err(Error::invalid(
        "low_confidence_ceiling must not exceed max_model_confidence",
      ));
    }
    for (name, v) in [
      ("interval_z", self.interval_z),
      ("default_interval_fraction", self.default_interval_fraction),
      ("min_interval_width", self.min_interval_width),
    ] {
      if !v.is_finite() || v < 0.0 {
        return Err(Error::InvalidInput(format!(
          "{name} must be a non-negative number, got {v}"
        )));
      }
    }
    if self.min_cohort_samples < 2 {
      return Err(Error::invalid("min_cohort_samples must be at least 2"));
    }
    if self.classifier_top_k == 0 {
      return Err(Error::invalid("classifier_top_k must be at least 1"));
    }
    Ok(())
  }
}

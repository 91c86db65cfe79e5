//! Tabular yield regression.
//!
//! [`YieldModel`] exposes both the estimate and the per-feature weights so
//! the analytics pipeline can explain which inputs moved the prediction.

use std::{collections::HashMap, path::Path, sync::Arc};

use agro_core::yields::{CohortKey, normalize};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{Error, Result};

// ─── Features ────────────────────────────────────────────────────────────────

/// Numeric model inputs.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Feature {
  AreaHa,
  FertilizerPerHa,
  PesticidePerHa,
  AnnualRainfallMm,
  AvgTempC,
  AvgHumidityPercent,
}

/// One fully-specified model input row. Missing weather has already been
/// imputed by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldFeatures {
  pub cohort:               CohortKey,
  pub area_ha:              f64,
  pub fertilizer_per_ha:    f64,
  pub pesticide_per_ha:     f64,
  pub annual_rainfall_mm:   f64,
  pub avg_temp_c:           f64,
  pub avg_humidity_percent: f64,
}

impl YieldFeatures {
  pub fn get(&self, feature: Feature) -> f64 {
    match feature {
      Feature::AreaHa => self.area_ha,
      Feature::FertilizerPerHa => self.fertilizer_per_ha,
      Feature::PesticidePerHa => self.pesticide_per_ha,
      Feature::AnnualRainfallMm => self.annual_rainfall_mm,
      Feature::AvgTempC => self.avg_temp_c,
      Feature::AvgHumidityPercent => self.avg_humidity_percent,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A trained yield regressor.
pub trait YieldModel: Send + Sync {
  /// Raw estimate in tonnes per hectare. May be negative; callers clamp.
  fn predict(&self, features: &YieldFeatures) -> f64;

  /// Marginal effect of one unit of `feature` on the estimate.
  fn coefficient(&self, feature: Feature) -> f64;

  /// Mean of `feature` over the training set, used for imputation.
  fn training_mean(&self, feature: Feature) -> f64;
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// The regressor as seen by the pipeline; fixed at startup.
#[derive(Clone)]
pub enum RegressorHandle {
  Available(Arc<dyn YieldModel>),
  Unavailable { reason: String },
}

impl RegressorHandle {
  pub fn available(model: impl YieldModel + 'static) -> Self {
    Self::Available(Arc::new(model))
  }

  pub fn unavailable(reason: impl Into<String>) -> Self {
    Self::Unavailable {
      reason: reason.into(),
    }
  }

  /// Load a [`LinearYieldModel`] artifact; failures are logged and produce
  /// an unavailable handle.
  pub fn load(path: Option<&Path>) -> Self {
    let Some(path) = path else {
      tracing::warn!("no yield model configured; predictions use cohort averages");
      return Self::unavailable("no yield model configured");
    };
    match LinearYieldModel::from_file(path) {
      Ok(model) => {
        tracing::info!(path = %path.display(), "yield model loaded");
        Self::available(model)
      }
      Err(e) => {
        tracing::warn!(
          path = %path.display(),
          error = %e,
          "yield model failed to load; predictions use cohort averages"
        );
        Self::unavailable(e.to_string())
      }
    }
  }

  pub fn is_available(&self) -> bool { matches!(self, Self::Available(_)) }

  pub fn model(&self) -> Option<&dyn YieldModel> {
    match self {
      Self::Available(model) => Some(model.as_ref()),
      Self::Unavailable { .. } => None,
    }
  }
}

impl std::fmt::Debug for RegressorHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Available(_) => f.write_str("RegressorHandle::Available"),
      Self::Unavailable { reason } => f
        .debug_struct("RegressorHandle::Unavailable")
        .field("reason", reason)
        .finish(),
    }
  }
}

// ─── Linear model ────────────────────────────────────────────────────────────

/// On-disk form of a fitted linear model with one-hot categorical offsets.
///
/// Categories absent from a map contribute nothing (the baseline level).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegressionArtifact {
  pub intercept:     f64,
  #[serde(default)]
  pub crop:          HashMap<String, f64>,
  #[serde(default)]
  pub state:         HashMap<String, f64>,
  #[serde(default)]
  pub season:        HashMap<String, f64>,
  #[serde(default)]
  pub coefficients:  HashMap<Feature, f64>,
  #[serde(default)]
  pub feature_means: HashMap<Feature, f64>,
}

#[derive(Debug, Clone)]
pub struct LinearYieldModel {
  artifact: RegressionArtifact,
}

fn normalize_keys(map: HashMap<String, f64>) -> HashMap<String, f64> {
  map.into_iter().map(|(k, v)| (normalize(&k), v)).collect()
}

impl LinearYieldModel {
  pub fn new(artifact: RegressionArtifact) -> Result<Self> {
    let mut values = std::iter::once(&artifact.intercept)
      .chain(artifact.crop.values())
      .chain(artifact.state.values())
      .chain(artifact.season.values())
      .chain(artifact.coefficients.values())
      .chain(artifact.feature_means.values());
    if values.any(|v| !v.is_finite()) {
      return Err(Error::Artifact("regression parameters must be finite".into()));
    }
    Ok(Self {
      artifact: RegressionArtifact {
        crop: normalize_keys(artifact.crop),
        state: normalize_keys(artifact.state),
        season: normalize_keys(artifact.season),
        ..artifact
      },
    })
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let json = std::fs::read_to_string(path)?;
    Self::new(serde_json::from_str(&json)?)
  }

  fn offset(map: &HashMap<String, f64>, level: Option<&str>) -> f64 {
    level.and_then(|l| map.get(l)).copied().unwrap_or(0.0)
  }
}

impl YieldModel for LinearYieldModel {
  fn predict(&self, features: &YieldFeatures) -> f64 {
    let a = &self.artifact;
    let key = &features.cohort;
    let categorical = Self::offset(&a.crop, Some(key.crop.as_str()))
      + Self::offset(&a.state, Some(key.state.as_str()))
      + Self::offset(&a.season, key.season.as_deref());
    let numeric: f64 = Feature::iter()
      .map(|f| self.coefficient(f) * features.get(f))
      .sum();
    a.intercept + categorical + numeric
  }

  fn coefficient(&self, feature: Feature) -> f64 {
    self
      .artifact
      .coefficients
      .get(&feature)
      .copied()
      .unwrap_or(0.0)
  }

  fn training_mean(&self, feature: Feature) -> f64 {
    self
      .artifact
      .feature_means
      .get(&feature)
      .copied()
      .unwrap_or(0.0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const ARTIFACT: &str = r#"{
    "intercept": 1.0,
    "crop": { "Rice": 0.5 },
    "state": { "PUNJAB": 0.25 },
    "season": { "kharif": -0.1 },
    "coefficients": { "fertilizer_per_ha": 0.01, "annual_rainfall_mm": 0.001 },
    "feature_means": { "avg_temp_c": 26.0, "annual_rainfall_mm": 900.0 }
  }"#;

  fn features(crop: &str) -> YieldFeatures {
    YieldFeatures {
      cohort:               CohortKey::new(crop, "Punjab", Some("Kharif")),
      area_ha:              2.0,
      fertilizer_per_ha:    100.0,
      pesticide_per_ha:     1.0,
      annual_rainfall_mm:   500.0,
      avg_temp_c:           25.0,
      avg_humidity_percent: 60.0,
    }
  }

  fn model() -> LinearYieldModel {
    LinearYieldModel::new(serde_json::from_str(ARTIFACT).unwrap()).unwrap()
  }

  #[test]
  fn linear_prediction() {
    let m = model();
    // 1.0 + 0.5 + 0.25 - 0.1 + 0.01*100 + 0.001*500
    assert!((m.predict(&features("rice")) - 3.15).abs() < 1e-9);
    assert_eq!(m.coefficient(Feature::PesticidePerHa), 0.0);
    assert_eq!(m.training_mean(Feature::AvgTempC), 26.0);
  }

  #[test]
  fn unknown_categories_use_the_baseline() {
    let m = model();
    assert!((m.predict(&features("sorghum")) - 2.65).abs() < 1e-9);
  }

  #[test]
  fn feature_names_are_snake_case() {
    assert_eq!(Feature::FertilizerPerHa.to_string(), "fertilizer_per_ha");
    assert_eq!(Feature::iter().count(), 6);
  }

  #[test]
  fn unknown_feature_name_fails_to_parse() {
    let json = r#"{ "intercept": 0.0, "coefficients": { "moon_phase": 1.0 } }"#;
    assert!(serde_json::from_str::<RegressionArtifact>(json).is_err());
  }

  #[test]
  fn missing_artifact_gives_unavailable_handle() {
    let handle = RegressorHandle::load(Some(Path::new("/nonexistent/yield.json")));
    assert!(!handle.is_available());
    assert!(handle.model().is_none());
  }
}

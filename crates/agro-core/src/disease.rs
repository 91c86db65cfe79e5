//! Disease reference records and diagnosis results.
//!
//! A [`DiseaseRecord`] is static reference data, loaded once and shared
//! read-only. A [`DiagnosisResult`] is built per request and never mutated.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Severity ────────────────────────────────────────────────────────────────

/// How far a disease has progressed. Governs which treatment plan applies.
///
/// Ordered `Mild < Moderate < Severe`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
  Mild,
  Moderate,
  Severe,
}

// ─── Treatment ───────────────────────────────────────────────────────────────

/// The actions recommended for one severity level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPlan {
  pub treatments:    Vec<String>,
  /// Estimated cost per hectare, in local currency units. Never negative.
  pub cost_estimate: f64,
}

// ─── DiseaseRecord ───────────────────────────────────────────────────────────

/// One diagnosable disease (or the `healthy` pseudo-disease).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRecord {
  pub id:                String,
  pub name:              String,
  #[serde(default)]
  pub symptoms:          Vec<String>,
  #[serde(default)]
  pub causes:            Vec<String>,
  /// Keyed by severity; a key outside {mild, moderate, severe} fails to
  /// deserialise.
  #[serde(default)]
  pub treatments:        BTreeMap<Severity, TreatmentPlan>,
  #[serde(default)]
  pub prevention:        Vec<String>,
  #[serde(default)]
  pub crops_affected:    Vec<String>,
  /// Disease-specific severity that wins over the confidence-derived tier.
  #[serde(default)]
  pub severity_override: Option<Severity>,
}

impl DiseaseRecord {
  pub fn validate(&self) -> Result<()> {
    if self.id.trim().is_empty() {
      return Err(Error::invalid("disease id must not be empty"));
    }
    for (severity, plan) in &self.treatments {
      if !plan.cost_estimate.is_finite() || plan.cost_estimate < 0.0 {
        return Err(Error::InvalidInput(format!(
          "disease {:?}: {severity} treatment has invalid cost estimate {}",
          self.id, plan.cost_estimate
        )));
      }
    }
    Ok(())
  }

  /// Whether the record lists `crop` (case-insensitive). A record with no
  /// crops listed applies to every crop.
  pub fn affects_crop(&self, crop: &str) -> bool {
    let crop = crop.trim();
    self.crops_affected.is_empty()
      || self
        .crops_affected
        .iter()
        .any(|c| c.trim().eq_ignore_ascii_case(crop))
  }
}

// ─── Classifier output ───────────────────────────────────────────────────────

/// One ranked classifier candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseCandidate {
  pub disease_id:  String,
  pub probability: f64,
}

// ─── DiagnosisResult ─────────────────────────────────────────────────────────

/// The outcome of one detection call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResult {
  pub detection_id:    Uuid,
  pub timestamp:       DateTime<Utc>,
  pub crop_type:       String,
  pub location:        Option<String>,
  pub disease:         DiseaseRecord,
  /// Always within `[0, 1]`.
  pub confidence:      f64,
  /// Derived from the classifier output and the record; never user-supplied.
  pub severity:        Severity,
  pub treatment_plan:  TreatmentPlan,
  pub recommendations: Vec<String>,
  pub next_steps:      Vec<String>,
  /// Runner-up candidates after the selected one.
  pub alternatives:    Vec<DiseaseCandidate>,
  /// `true` when the result was synthesised without a usable classification.
  pub fallback:        bool,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  fn record() -> DiseaseRecord {
    DiseaseRecord {
      id:                "leaf_rust".into(),
      name:              "Leaf Rust".into(),
      symptoms:          vec![],
      causes:            vec![],
      treatments:        BTreeMap::from([(
        Severity::Mild,
        TreatmentPlan {
          treatments:    vec!["Scout weekly".into()],
          cost_estimate: 0.0,
        },
      )]),
      prevention:        vec![],
      crops_affected:    vec!["Wheat".into()],
      severity_override: None,
    }
  }

  #[test]
  fn severity_orders_and_parses() {
    assert!(Severity::Mild < Severity::Moderate);
    assert!(Severity::Moderate < Severity::Severe);
    assert_eq!(Severity::from_str("SEVERE").unwrap(), Severity::Severe);
    assert_eq!(Severity::Moderate.to_string(), "moderate");
  }

  #[test]
  fn negative_cost_is_rejected() {
    let mut r = record();
    r.treatments.get_mut(&Severity::Mild).unwrap().cost_estimate = -1.0;
    assert!(matches!(r.validate(), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn treatment_keys_round_trip_through_json() {
    let json = serde_json::to_string(&record()).unwrap();
    assert!(json.contains("\"mild\""));
    let back: DiseaseRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record());
  }

  #[test]
  fn unknown_severity_key_fails() {
    let json = r#"{"id":"x","name":"X","treatments":{"critical":{"treatments":[],"cost_estimate":1.0}}}"#;
    assert!(serde_json::from_str::<DiseaseRecord>(json).is_err());
  }

  #[test]
  fn affects_crop_is_case_insensitive() {
    let r = record();
    assert!(r.affects_crop(" wheat "));
    assert!(!r.affects_crop("rice"));
  }
}

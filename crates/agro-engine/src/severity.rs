//! Severity tiers and treatment plan selection.

use agro_core::disease::{DiseaseRecord, Severity, TreatmentPlan};

/// Confidence at or above which a finding is treated as severe.
pub const SEVERE_THRESHOLD: f64 = 0.85;

/// Confidence at or above which a finding is treated as moderate.
pub const MODERATE_THRESHOLD: f64 = 0.5;

/// Map classifier confidence onto a tier. NaN lands in the lowest tier.
pub fn tier_from_confidence(confidence: f64) -> Severity {
  if confidence >= SEVERE_THRESHOLD {
    Severity::Severe
  } else if confidence >= MODERATE_THRESHOLD {
    Severity::Moderate
  } else {
    Severity::Mild
  }
}

/// A record's fixed severity wins over the confidence tier.
pub fn resolve_severity(record: &DiseaseRecord, confidence: f64) -> Severity {
  record
    .severity_override
    .unwrap_or_else(|| tier_from_confidence(confidence))
}

/// The plan for `severity`, else the moderate plan, else an empty plan.
pub fn select_treatment_plan(
  record: &DiseaseRecord,
  severity: Severity,
) -> TreatmentPlan {
  record
    .treatments
    .get(&severity)
    .or_else(|| record.treatments.get(&Severity::Moderate))
    .cloned()
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;

  fn plan(name: &str, cost: f64) -> TreatmentPlan {
    TreatmentPlan {
      treatments:    vec![name.to_owned()],
      cost_estimate: cost,
    }
  }

  fn record(
    treatments: BTreeMap<Severity, TreatmentPlan>,
    severity_override: Option<Severity>,
  ) -> DiseaseRecord {
    DiseaseRecord {
      id: "leaf_spot".into(),
      name: "Leaf Spot".into(),
      treatments,
      severity_override,
      ..DiseaseRecord::default()
    }
  }

  #[test]
  fn tier_boundaries() {
    assert_eq!(tier_from_confidence(0.85), Severity::Severe);
    assert_eq!(tier_from_confidence(0.849), Severity::Moderate);
    assert_eq!(tier_from_confidence(0.5), Severity::Moderate);
    assert_eq!(tier_from_confidence(0.4999), Severity::Mild);
    assert_eq!(tier_from_confidence(0.0), Severity::Mild);
    assert_eq!(tier_from_confidence(f64::NAN), Severity::Mild);
  }

  #[test]
  fn tiers_never_decrease_with_confidence() {
    let tiers: Vec<Severity> = (0..=100)
      .map(|i| tier_from_confidence(f64::from(i) / 100.0))
      .collect();
    assert!(tiers.windows(2).all(|w| w[0] <= w[1]));
  }

  #[test]
  fn override_wins_over_confidence() {
    let r = record(BTreeMap::new(), Some(Severity::Severe));
    assert_eq!(resolve_severity(&r, 0.1), Severity::Severe);

    let r = record(BTreeMap::new(), None);
    assert_eq!(resolve_severity(&r, 0.9), Severity::Severe);
  }

  #[test]
  fn missing_tier_falls_back_to_moderate() {
    let r = record(
      BTreeMap::from([
        (Severity::Mild, plan("dust", 100.0)),
        (Severity::Moderate, plan("spray", 900.0)),
      ]),
      None,
    );
    assert_eq!(select_treatment_plan(&r, Severity::Severe), plan("spray", 900.0));
    assert_eq!(select_treatment_plan(&r, Severity::Mild), plan("dust", 100.0));
  }

  #[test]
  fn no_plans_gives_empty_plan() {
    let r = record(
      BTreeMap::from([(Severity::Mild, plan("dust", 100.0))]),
      None,
    );
    let selected = select_treatment_plan(&r, Severity::Severe);
    assert!(selected.treatments.is_empty());
    assert_eq!(selected.cost_estimate, 0.0);
  }
}

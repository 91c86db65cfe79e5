//! Advisory text attached to diagnoses.

use std::collections::BTreeMap;

use agro_core::disease::{DiseaseRecord, Severity, TreatmentPlan};

/// Id and name given to the record returned when no diagnosis is possible.
pub const UNKNOWN_DISEASE: &str = "unknown";

/// Below this the farmer is asked for a better photo.
const LOW_CONFIDENCE: f64 = 0.5;

/// Stand-in record for a diagnosis the pipeline could not make.
pub fn fallback_record(crop_type: &str) -> DiseaseRecord {
  DiseaseRecord {
    id: UNKNOWN_DISEASE.into(),
    name: UNKNOWN_DISEASE.into(),
    treatments: BTreeMap::from([(Severity::Moderate, TreatmentPlan {
      treatments:    vec![
        "Isolate plants showing symptoms".into(),
        "Remove and destroy badly affected leaves".into(),
        "Avoid spraying until the disease is identified".into(),
      ],
      cost_estimate: 0.0,
    })]),
    prevention: vec![
      "Inspect the crop at least once a week".into(),
      "Keep tools and equipment clean between fields".into(),
      "Avoid waterlogging and overhead irrigation in the evening".into(),
    ],
    crops_affected: vec![crop_type.trim().to_owned()],
    ..DiseaseRecord::default()
  }
}

/// Region-specific notes. Empty when no location was given.
pub fn location_advisories(location: Option<&str>) -> Vec<String> {
  match location.map(str::trim).filter(|l| !l.is_empty()) {
    Some(place) => vec![
      format!("Check current disease alerts issued for {place}"),
      format!(
        "Ask the nearest agricultural extension office in {place} about \
         approved products"
      ),
    ],
    None => Vec::new(),
  }
}

/// Compare farmer-reported symptoms with the record's known symptoms.
pub fn symptom_note(
  record: &DiseaseRecord,
  reported: Option<&str>,
) -> Option<String> {
  let reported = reported.map(str::trim).filter(|s| !s.is_empty())?;
  let lower = reported.to_lowercase();
  let matched: Vec<&str> = record
    .symptoms
    .iter()
    .filter(|known| {
      known
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 4)
        .any(|w| lower.contains(w))
    })
    .map(String::as_str)
    .collect();

  Some(if record.symptoms.is_empty() {
    format!("Describe the reported symptoms ({reported}) to an extension officer")
  } else if matched.is_empty() {
    format!(
      "Reported symptoms ({reported}) do not match typical signs of {}; \
       confirm before treating",
      record.name
    )
  } else {
    format!(
      "Reported symptoms are consistent with {}: {}",
      record.name,
      matched.join(", ")
    )
  })
}

/// Plan entries surfaced in the recommendations list.
const TREATMENT_HIGHLIGHTS: usize = 2;

/// Prevention advice, then the first treatment steps, then location notes.
pub fn recommendations(
  record: &DiseaseRecord,
  severity: Severity,
  plan: &TreatmentPlan,
  location: Option<&str>,
) -> Vec<String> {
  let highlights = plan
    .treatments
    .iter()
    .take(TREATMENT_HIGHLIGHTS)
    .map(|t| format!("Treatment ({severity}): {t}"));
  record
    .prevention
    .iter()
    .cloned()
    .chain(highlights)
    .chain(location_advisories(location))
    .collect()
}

/// Ordered follow-up actions for an identified disease.
pub fn next_steps(
  record: &DiseaseRecord,
  severity: Severity,
  confidence: f64,
  reported_symptoms: Option<&str>,
) -> Vec<String> {
  let mut steps: Vec<String> = match severity {
    Severity::Severe => vec![
      "Start treatment within 24 hours".into(),
      "Isolate affected plants to slow the spread".into(),
      "Re-inspect the field after 3 days".into(),
    ],
    Severity::Moderate => vec![
      "Start treatment within 3 days".into(),
      "Monitor neighbouring plants every 2 to 3 days".into(),
    ],
    Severity::Mild => vec!["Monitor the crop weekly for new symptoms".into()],
  };
  if confidence < LOW_CONFIDENCE {
    steps.push(
      "Identification confidence is low; retake a clear, well-lit photo of \
       the affected leaf"
        .into(),
    );
  }
  steps.extend(symptom_note(record, reported_symptoms));
  steps
}

/// Follow-up actions when no diagnosis could be made.
pub fn fallback_next_steps(reported_symptoms: Option<&str>) -> Vec<String> {
  let mut steps: Vec<String> = vec![
    "Automated identification is unavailable; try again later".into(),
    "Take a sample of the affected leaves to an extension officer".into(),
  ];
  steps.extend(reported_symptoms.map(str::trim).filter(|s| !s.is_empty()).map(
    |s| format!("Describe the reported symptoms ({s}) to an extension officer"),
  ));
  steps
}

#[cfg(test)]
mod tests {
  use super::*;

  fn blast() -> DiseaseRecord {
    DiseaseRecord {
      id: "rice_blast".into(),
      name: "Rice Blast".into(),
      symptoms: vec![
        "diamond-shaped lesions with grey centres".into(),
        "neck rot".into(),
      ],
      ..DiseaseRecord::default()
    }
  }

  #[test]
  fn blank_location_gives_no_advisories() {
    assert!(location_advisories(None).is_empty());
    assert!(location_advisories(Some("  ")).is_empty());
    assert_eq!(location_advisories(Some("Ludhiana")).len(), 2);
  }

  #[test]
  fn symptom_matching() {
    let note = symptom_note(&blast(), Some("Grey lesions on leaves")).unwrap();
    assert!(note.contains("consistent with Rice Blast"));

    let note = symptom_note(&blast(), Some("wilting")).unwrap();
    assert!(note.contains("do not match"));

    assert!(symptom_note(&blast(), Some("")).is_none());
    assert!(symptom_note(&blast(), None).is_none());
  }

  #[test]
  fn low_confidence_asks_for_a_new_photo() {
    let steps = next_steps(&blast(), Severity::Mild, 0.3, None);
    assert!(steps.iter().any(|s| s.contains("retake")));

    let steps = next_steps(&blast(), Severity::Severe, 0.9, None);
    assert!(!steps.iter().any(|s| s.contains("retake")));
    assert!(steps[0].contains("24 hours"));
  }

  #[test]
  fn recommendations_highlight_the_plan() {
    let record = DiseaseRecord {
      prevention: vec!["Use resistant varieties".into()],
      ..blast()
    };
    let plan = TreatmentPlan {
      treatments:    vec!["first".into(), "second".into(), "third".into()],
      cost_estimate: 10.0,
    };
    let recs = recommendations(&record, Severity::Severe, &plan, Some("Ludhiana"));
    assert_eq!(recs[0], "Use resistant varieties");
    assert_eq!(recs[1], "Treatment (severe): first");
    assert_eq!(recs[2], "Treatment (severe): second");
    assert!(!recs.iter().any(|r| r.contains("third")));
    assert!(recs[3].contains("Ludhiana"));
    assert_eq!(recs.len(), 5);
  }

  #[test]
  fn fallback_record_has_a_moderate_plan() {
    let r = fallback_record(" Wheat ");
    assert_eq!(r.id, UNKNOWN_DISEASE);
    assert_eq!(r.crops_affected, vec!["Wheat".to_owned()]);
    assert!(r.treatments.contains_key(&Severity::Moderate));
  }
}

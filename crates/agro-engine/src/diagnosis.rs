//! [`DiagnosisPipeline`]: leaf photo in, diagnosis and treatment plan out.

use std::sync::Arc;

use agro_core::{
  Error as CoreError,
  disease::{DiagnosisResult, DiseaseCandidate, DiseaseRecord, Severity},
  stamp::{Stamp, SystemStamp},
};
use agro_models::{ClassifierHandle, decode_image};
use agro_reference::KnowledgeBase;

use crate::{advisory, severity};

pub struct DiagnosisPipeline {
  classifier: ClassifierHandle,
  knowledge:  Arc<KnowledgeBase>,
  stamp:      Arc<dyn Stamp>,
}

/// What the classifier settled on, resolved against the knowledge base.
struct Identified<'a> {
  record:       &'a DiseaseRecord,
  confidence:   f64,
  alternatives: Vec<DiseaseCandidate>,
}

impl DiagnosisPipeline {
  pub fn new(classifier: ClassifierHandle, knowledge: Arc<KnowledgeBase>) -> Self {
    Self {
      classifier,
      knowledge,
      stamp: Arc::new(SystemStamp),
    }
  }

  pub fn with_stamp(mut self, stamp: Arc<dyn Stamp>) -> Self {
    self.stamp = stamp;
    self
  }

  /// Diagnose one photo.
  ///
  /// Only malformed input is an error. An unavailable classifier or a label
  /// missing from the knowledge base yields a fallback result with
  /// `fallback` set, zero confidence and moderate severity.
  pub fn diagnose(
    &self,
    crop_type: &str,
    image: &[u8],
    location: Option<&str>,
    additional_symptoms: Option<&str>,
  ) -> agro_core::Result<DiagnosisResult> {
    let crop_type = crop_type.trim();
    if crop_type.is_empty() {
      return Err(CoreError::invalid("crop_type must not be empty"));
    }
    let image = decode_image(image)?;
    let location = location.map(str::trim).filter(|l| !l.is_empty());

    let identified = self
      .classifier
      .classify(&image, crop_type)
      .and_then(|candidates| self.identify(candidates));

    match identified {
      Ok(found) => Ok(self.build(crop_type, location, additional_symptoms, found)),
      Err(CoreError::InvalidInput(msg)) => Err(CoreError::InvalidInput(msg)),
      Err(CoreError::ModelUnavailable(reason)) => {
        tracing::debug!(%reason, crop = crop_type, "classifier unavailable; returning fallback");
        Ok(self.fallback(crop_type, location, additional_symptoms))
      }
      Err(e) => {
        tracing::warn!(error = %e, crop = crop_type, "diagnosis failed; returning fallback");
        Ok(self.fallback(crop_type, location, additional_symptoms))
      }
    }
  }

  fn identify(
    &self,
    candidates: Vec<DiseaseCandidate>,
  ) -> agro_core::Result<Identified<'_>> {
    let mut candidates = candidates.into_iter();
    let top = candidates.next().ok_or_else(|| {
      CoreError::UnknownDisease("classifier returned no candidates".into())
    })?;
    let record = self.knowledge.require(&top.disease_id)?;
    let confidence = if top.probability.is_finite() {
      top.probability.clamp(0.0, 1.0)
    } else {
      0.0
    };
    Ok(Identified {
      record,
      confidence,
      alternatives: candidates.collect(),
    })
  }

  fn build(
    &self,
    crop_type: &str,
    location: Option<&str>,
    additional_symptoms: Option<&str>,
    found: Identified<'_>,
  ) -> DiagnosisResult {
    let Identified {
      record,
      confidence,
      alternatives,
    } = found;
    let severity = severity::resolve_severity(record, confidence);
    let treatment_plan = severity::select_treatment_plan(record, severity);

    tracing::info!(
      crop = crop_type,
      disease = %record.id,
      confidence,
      severity = %severity,
      "diagnosis complete"
    );

    let recommendations =
      advisory::recommendations(record, severity, &treatment_plan, location);

    DiagnosisResult {
      detection_id: self.stamp.next_id(),
      timestamp: self.stamp.now(),
      crop_type: crop_type.to_owned(),
      location: location.map(str::to_owned),
      disease: record.clone(),
      confidence,
      severity,
      treatment_plan,
      recommendations,
      next_steps: advisory::next_steps(
        record,
        severity,
        confidence,
        additional_symptoms,
      ),
      alternatives,
      fallback: false,
    }
  }

  fn fallback(
    &self,
    crop_type: &str,
    location: Option<&str>,
    additional_symptoms: Option<&str>,
  ) -> DiagnosisResult {
    let record = advisory::fallback_record(crop_type);
    let severity = Severity::Moderate;
    let treatment_plan = severity::select_treatment_plan(&record, severity);
    DiagnosisResult {
      detection_id: self.stamp.next_id(),
      timestamp: self.stamp.now(),
      crop_type: crop_type.to_owned(),
      location: location.map(str::to_owned),
      recommendations: advisory::recommendations(
        &record,
        severity,
        &treatment_plan,
        location,
      ),
      next_steps: advisory::fallback_next_steps(additional_symptoms),
      disease: record,
      confidence: 0.0,
      severity,
      treatment_plan,
      alternatives: Vec::new(),
      fallback: true,
    }
  }
}

impl std::fmt::Debug for DiagnosisPipeline {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DiagnosisPipeline")
      .field("classifier", &self.classifier)
      .field("diseases", &self.knowledge.len())
      .finish()
  }
}

//! Disease classification from leaf images.
//!
//! [`DiseaseClassifier`] is the seam the diagnosis pipeline depends on.
//! [`LeafColourClassifier`] is the artifact-backed implementation: a linear
//! softmax model over [`colour_features`].

use std::{collections::HashMap, path::Path, sync::Arc};

use agro_core::{Error as CoreError, disease::DiseaseCandidate, yields::normalize};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  features::{DEFAULT_INPUT_SIZE, FEATURE_COUNT, colour_features},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A trained image classifier.
pub trait DiseaseClassifier: Send + Sync {
  /// Rank candidate diseases for an already-decoded image.
  ///
  /// Probabilities sum to at most 1. Candidates are ordered by descending
  /// probability, ties by ascending disease id.
  fn classify(
    &self,
    image: &DynamicImage,
    crop_type: &str,
  ) -> agro_core::Result<Vec<DiseaseCandidate>>;
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// The classifier as seen by the pipeline: built once at startup and never
/// reloaded.
#[derive(Clone)]
pub enum ClassifierHandle {
  Available(Arc<dyn DiseaseClassifier>),
  Unavailable { reason: String },
}

impl ClassifierHandle {
  pub fn available(classifier: impl DiseaseClassifier + 'static) -> Self {
    Self::Available(Arc::new(classifier))
  }

  pub fn unavailable(reason: impl Into<String>) -> Self {
    Self::Unavailable {
      reason: reason.into(),
    }
  }

  /// Load a [`LeafColourClassifier`] artifact. Any failure is logged and
  /// produces an unavailable handle.
  pub fn load(path: Option<&Path>, top_k: Option<usize>) -> Self {
    let Some(path) = path else {
      tracing::warn!("no classifier model configured; diagnosis runs in fallback mode");
      return Self::unavailable("no classifier model configured");
    };
    match LeafColourClassifier::from_file(path) {
      Ok(classifier) => {
        let classifier = match top_k {
          Some(k) => classifier.with_top_k(k),
          None => classifier,
        };
        tracing::info!(
          path = %path.display(),
          labels = classifier.labels().len(),
          "classifier model loaded"
        );
        Self::available(classifier)
      }
      Err(e) => {
        tracing::warn!(
          path = %path.display(),
          error = %e,
          "classifier model failed to load; diagnosis runs in fallback mode"
        );
        Self::unavailable(e.to_string())
      }
    }
  }

  pub fn is_available(&self) -> bool { matches!(self, Self::Available(_)) }

  /// Classify, or report [`CoreError::ModelUnavailable`].
  pub fn classify(
    &self,
    image: &DynamicImage,
    crop_type: &str,
  ) -> agro_core::Result<Vec<DiseaseCandidate>> {
    match self {
      Self::Available(classifier) => classifier.classify(image, crop_type),
      Self::Unavailable { reason } => {
        Err(CoreError::ModelUnavailable(reason.clone()))
      }
    }
  }
}

impl std::fmt::Debug for ClassifierHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Available(_) => f.write_str("ClassifierHandle::Available"),
      Self::Unavailable { reason } => f
        .debug_struct("ClassifierHandle::Unavailable")
        .field("reason", reason)
        .finish(),
    }
  }
}

// ─── Artifact ────────────────────────────────────────────────────────────────

fn default_top_k() -> usize { 5 }

fn default_input_size() -> u32 { DEFAULT_INPUT_SIZE }

/// On-disk form of a trained colour classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
  /// Disease ids, one per output row.
  pub labels:      Vec<String>,
  /// Crops each label applies to. Labels without an entry apply to all.
  #[serde(default)]
  pub label_crops: HashMap<String, Vec<String>>,
  /// `labels.len()` rows of `FEATURE_COUNT` weights.
  pub weights:     Vec<Vec<f64>>,
  pub bias:        Vec<f64>,
  #[serde(default = "default_top_k")]
  pub top_k:       usize,
  #[serde(default = "default_input_size")]
  pub input_size:  u32,
}

impl ClassifierArtifact {
  fn validate(&self) -> Result<()> {
    let n = self.labels.len();
    if n == 0 {
      return Err(Error::Artifact("classifier has no labels".into()));
    }
    if self.weights.len() != n || self.bias.len() != n {
      return Err(Error::Artifact(format!(
        "expected {n} weight rows and biases, got {} and {}",
        self.weights.len(),
        self.bias.len()
      )));
    }
    if let Some(row) = self.weights.iter().find(|r| r.len() != FEATURE_COUNT) {
      return Err(Error::Artifact(format!(
        "weight rows must have {FEATURE_COUNT} entries, found {}",
        row.len()
      )));
    }
    let all_finite = self
      .weights
      .iter()
      .flatten()
      .chain(self.bias.iter())
      .all(|v| v.is_finite());
    if !all_finite {
      return Err(Error::Artifact("weights must be finite".into()));
    }
    let mut seen: Vec<String> = self.labels.iter().map(|l| normalize(l)).collect();
    seen.sort();
    seen.dedup();
    if seen.len() != n {
      return Err(Error::Artifact("labels must be unique".into()));
    }
    if let Some(key) = self
      .label_crops
      .keys()
      .find(|k| seen.binary_search(&normalize(k)).is_err())
    {
      return Err(Error::Artifact(format!(
        "label_crops names unknown label {key:?}"
      )));
    }
    if self.top_k == 0 {
      return Err(Error::Artifact("top_k must be at least 1".into()));
    }
    Ok(())
  }
}

// ─── Model ───────────────────────────────────────────────────────────────────

/// Numerically stable softmax.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
  let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
  let sum: f64 = exps.iter().sum();
  if sum == 0.0 || !sum.is_finite() {
    return vec![0.0; logits.len()];
  }
  exps.into_iter().map(|e| e / sum).collect()
}

/// Linear softmax classifier over leaf colour features.
#[derive(Debug, Clone)]
pub struct LeafColourClassifier {
  artifact: ClassifierArtifact,
}

impl LeafColourClassifier {
  pub fn new(mut artifact: ClassifierArtifact) -> Result<Self> {
    artifact.validate()?;
    artifact.labels = artifact.labels.iter().map(|l| normalize(l)).collect();
    artifact.label_crops = artifact
      .label_crops
      .into_iter()
      .map(|(label, crops)| {
        (normalize(&label), crops.iter().map(|c| normalize(c)).collect())
      })
      .collect();
    Ok(Self { artifact })
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let json = std::fs::read_to_string(path)?;
    Self::new(serde_json::from_str(&json)?)
  }

  pub fn with_top_k(mut self, top_k: usize) -> Self {
    self.artifact.top_k = top_k.max(1);
    self
  }

  pub fn labels(&self) -> &[String] { &self.artifact.labels }

  fn applies_to(&self, label: &str, crop: &str) -> bool {
    self
      .artifact
      .label_crops
      .get(label)
      .is_none_or(|crops| crops.iter().any(|c| c == crop))
  }

  /// Rank labels for a precomputed feature vector.
  pub fn rank(
    &self,
    features: &[f64; FEATURE_COUNT],
    crop_type: &str,
  ) -> Vec<DiseaseCandidate> {
    let logits: Vec<f64> = self
      .artifact
      .weights
      .iter()
      .zip(&self.artifact.bias)
      .map(|(row, bias)| {
        row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + bias
      })
      .collect();
    let probabilities = softmax(&logits);

    let crop = normalize(crop_type);
    let all: Vec<DiseaseCandidate> = self
      .artifact
      .labels
      .iter()
      .zip(probabilities)
      .map(|(label, probability)| DiseaseCandidate {
        disease_id: label.clone(),
        probability,
      })
      .collect();

    let mut candidates: Vec<DiseaseCandidate> = all
      .iter()
      .filter(|c| self.applies_to(&c.disease_id, &crop))
      .cloned()
      .collect();
    if candidates.is_empty() {
      tracing::debug!(crop = %crop, "no labels registered for crop; ranking all labels");
      candidates = all;
    }

    candidates.sort_by(|a, b| {
      b.probability
        .total_cmp(&a.probability)
        .then_with(|| a.disease_id.cmp(&b.disease_id))
    });
    candidates.truncate(self.artifact.top_k);
    candidates
  }
}

impl DiseaseClassifier for LeafColourClassifier {
  fn classify(
    &self,
    image: &DynamicImage,
    crop_type: &str,
  ) -> agro_core::Result<Vec<DiseaseCandidate>> {
    let features = colour_features(image, self.artifact.input_size);
    Ok(self.rank(&features, crop_type))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::features::{decode_image, tests::solid_png};

  /// Three labels keyed on green, brown and white fractions.
  fn artifact() -> ClassifierArtifact {
    let row = |green: f64, brown: f64, white: f64| {
      vec![0.0, 0.0, 0.0, green, 0.0, brown, white, 0.0]
    };
    ClassifierArtifact {
      labels:      vec!["healthy".into(), "Brown_Spot".into(), "powdery_mildew".into()],
      label_crops: HashMap::from([
        ("brown_spot".to_string(), vec!["Rice".to_string()]),
        ("powdery_mildew".to_string(), vec!["Wheat".to_string()]),
      ]),
      weights:     vec![row(6.0, 0.0, 0.0), row(0.0, 6.0, 0.0), row(0.0, 0.0, 6.0)],
      bias:        vec![0.0, 0.0, 0.0],
      top_k:       5,
      input_size:  16,
    }
  }

  fn classifier() -> LeafColourClassifier {
    LeafColourClassifier::new(artifact()).unwrap()
  }

  #[test]
  fn brown_rice_leaf_ranks_brown_spot_first() {
    let img = decode_image(&solid_png(140, 80, 30)).unwrap();
    let ranked = classifier().classify(&img, "Rice").unwrap();

    assert_eq!(ranked[0].disease_id, "brown_spot");
    // powdery_mildew is wheat-only and must be filtered out for rice.
    assert!(ranked.iter().all(|c| c.disease_id != "powdery_mildew"));
    let total: f64 = ranked.iter().map(|c| c.probability).sum();
    assert!(total <= 1.0 + 1e-9);
  }

  #[test]
  fn ties_break_by_ascending_id() {
    let mut a = artifact();
    a.weights = vec![vec![0.0; FEATURE_COUNT]; 3];
    a.label_crops.clear();
    let ranked = LeafColourClassifier::new(a)
      .unwrap()
      .rank(&[0.0; FEATURE_COUNT], "Maize");
    let ids: Vec<&str> = ranked.iter().map(|c| c.disease_id.as_str()).collect();
    assert_eq!(ids, vec!["brown_spot", "healthy", "powdery_mildew"]);
  }

  #[test]
  fn top_k_limits_candidates() {
    let mut a = artifact();
    a.label_crops.clear();
    let classifier = LeafColourClassifier::new(a).unwrap();
    assert_eq!(classifier.rank(&[0.0; FEATURE_COUNT], "Maize").len(), 3);

    let ranked = classifier.with_top_k(1).rank(&[0.0; FEATURE_COUNT], "Maize");
    assert_eq!(ranked.len(), 1);
  }

  #[test]
  fn crop_filter_falls_back_to_all_labels() {
    let mut a = artifact();
    a.label_crops
      .insert("healthy".to_string(), vec!["Rice".to_string()]);
    let ranked = LeafColourClassifier::new(a)
      .unwrap()
      .rank(&[0.0; FEATURE_COUNT], "Cotton");
    assert_eq!(ranked.len(), 3);
  }

  #[test]
  fn malformed_artifacts_are_rejected() {
    let mut a = artifact();
    a.bias.pop();
    assert!(matches!(LeafColourClassifier::new(a), Err(Error::Artifact(_))));

    let mut a = artifact();
    a.weights[0].push(1.0);
    assert!(LeafColourClassifier::new(a).is_err());

    let mut a = artifact();
    a.labels[2] = "HEALTHY".into();
    assert!(LeafColourClassifier::new(a).is_err());
  }

  #[test]
  fn crop_filter_keys_must_name_labels() {
    let mut a = artifact();
    a.label_crops
      .insert("brown_sopt".to_string(), vec!["Rice".to_string()]);
    assert!(matches!(LeafColourClassifier::new(a), Err(Error::Artifact(_))));

    let mut a = artifact();
    a.label_crops
      .insert(" Healthy ".to_string(), vec!["Rice".to_string()]);
    assert!(LeafColourClassifier::new(a).is_ok());
  }

  #[test]
  fn missing_artifact_gives_unavailable_handle() {
    let handle = ClassifierHandle::load(
      Some(Path::new("/nonexistent/classifier.json")),
      None,
    );
    assert!(!handle.is_available());

    let img = decode_image(&solid_png(40, 160, 40)).unwrap();
    assert!(matches!(
      handle.classify(&img, "Wheat"),
      Err(CoreError::ModelUnavailable(_))
    ));
    assert!(!ClassifierHandle::load(None, None).is_available());
  }

  #[test]
  fn softmax_sums_to_one() {
    let p = softmax(&[1.0, 2.0, 3.0, 1000.0]);
    assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(p[3] > 0.99);
  }
}

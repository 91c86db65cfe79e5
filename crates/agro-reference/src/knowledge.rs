//! [`KnowledgeBase`]: disease reference records keyed by id.

use std::{collections::HashMap, path::Path};

use agro_core::{Error as CoreError, disease::DiseaseRecord, yields::normalize};

use crate::{Error, Result};

/// Records shipped with the crate.
const BUILTIN: &str = include_str!("../data/diseases.json");

/// Immutable disease lookup table.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
  records: HashMap<String, DiseaseRecord>,
}

impl KnowledgeBase {
  /// The built-in table bundled with the crate.
  pub fn builtin() -> Result<Self> { Self::from_json_str(BUILTIN) }

  /// Parse a JSON array of [`DiseaseRecord`]s.
  pub fn from_json_str(json: &str) -> Result<Self> {
    let records: Vec<DiseaseRecord> = serde_json::from_str(json)?;
    Self::from_records(records)
  }

  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
    let json = std::fs::read_to_string(path)?;
    Self::from_json_str(&json)
  }

  /// Validate and index `records`. Ids must be unique after normalisation.
  pub fn from_records(
    records: impl IntoIterator<Item = DiseaseRecord>,
  ) -> Result<Self> {
    let mut map = HashMap::new();
    for record in records {
      record.validate()?;
      let id = normalize(&record.id);
      if map.contains_key(&id) {
        return Err(Error::DuplicateDisease(record.id));
      }
      map.insert(id, record);
    }
    tracing::info!(diseases = map.len(), "knowledge base loaded");
    Ok(Self { records: map })
  }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn get(&self, id: &str) -> Option<&DiseaseRecord> {
    self.records.get(&normalize(id))
  }

  /// Like [`get`](Self::get) but reports a missing id as
  /// [`CoreError::UnknownDisease`].
  pub fn require(&self, id: &str) -> agro_core::Result<&DiseaseRecord> {
    self
      .get(id)
      .ok_or_else(|| CoreError::UnknownDisease(id.to_owned()))
  }

  /// Records that list `crop`, sorted by id.
  pub fn for_crop(&self, crop: &str) -> Vec<&DiseaseRecord> {
    let mut out: Vec<&DiseaseRecord> = self
      .records
      .values()
      .filter(|r| r.affects_crop(crop))
      .collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
  }
}

#[cfg(test)]
mod tests {
  use agro_core::disease::Severity;

  use super::*;

  #[test]
  fn builtin_table_loads() {
    let kb = KnowledgeBase::builtin().unwrap();
    assert!(kb.len() >= 8);

    let blight = kb.get("Late_Blight").unwrap();
    assert_eq!(blight.severity_override, Some(Severity::Severe));
    assert!(blight.affects_crop("potato"));

    // Brown spot deliberately ships without a severe plan.
    assert!(
      !kb
        .get("brown_spot")
        .unwrap()
        .treatments
        .contains_key(&Severity::Severe)
    );
  }

  #[test]
  fn require_reports_unknown_ids() {
    let kb = KnowledgeBase::builtin().unwrap();
    assert!(kb.require("rice_blast").is_ok());
    assert!(matches!(
      kb.require("citrus_canker"),
      Err(CoreError::UnknownDisease(id)) if id == "citrus_canker"
    ));
  }

  #[test]
  fn duplicate_ids_are_rejected() {
    let json = r#"[{"id":"rust","name":"A"},{"id":"RUST","name":"B"}]"#;
    assert!(matches!(
      KnowledgeBase::from_json_str(json),
      Err(Error::DuplicateDisease(_))
    ));
  }

  #[test]
  fn crop_filter_includes_crop_agnostic_records() {
    let kb = KnowledgeBase::builtin().unwrap();
    let rice: Vec<&str> =
      kb.for_crop("Rice").iter().map(|r| r.id.as_str()).collect();
    assert!(rice.contains(&"healthy"));
    assert!(rice.contains(&"rice_blast"));
    assert!(!rice.contains(&"leaf_rust"));
  }
}

//! Yield records, cohort keys and yield analytics results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Cohort key ──────────────────────────────────────────────────────────────

/// Trimmed, lower-cased form used for every crop/state/season comparison.
pub fn normalize(s: &str) -> String { s.trim().to_lowercase() }

/// Identifies a reference population of historical records.
///
/// `season: None` means "all seasons" for the crop and state. Fields are
/// always stored normalised, so two keys built from differently-cased input
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CohortKey {
  pub crop:   String,
  pub state:  String,
  pub season: Option<String>,
}

impl CohortKey {
  pub fn new(crop: &str, state: &str, season: Option<&str>) -> Self {
    Self {
      crop:   normalize(crop),
      state:  normalize(state),
      season: season.map(normalize).filter(|s| !s.is_empty()),
    }
  }

  /// The same crop and state with the season filter dropped.
  pub fn without_season(&self) -> Self {
    Self {
      crop:   self.crop.clone(),
      state:  self.state.clone(),
      season: None,
    }
  }
}

impl std::fmt::Display for CohortKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match &self.season {
      Some(season) => write!(f, "{}/{}/{}", self.crop, self.state, season),
      None => write!(f, "{}/{}", self.crop, self.state),
    }
  }
}

// ─── Historical record ───────────────────────────────────────────────────────

/// One historical harvest for a district-level cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRecord {
  pub crop:            String,
  pub crop_year:       i32,
  pub season:          String,
  pub state:           String,
  /// Hectares.
  pub area:            f64,
  /// Tonnes.
  pub production:      f64,
  /// Millimetres.
  pub annual_rainfall: f64,
  /// Kilograms applied across the whole area.
  pub fertilizer:      f64,
  /// Kilograms applied across the whole area.
  pub pesticide:       f64,
  /// Tonnes per hectare.
  #[serde(rename = "yield")]
  pub yield_per_ha:    f64,
}

impl YieldRecord {
  pub fn validate(&self) -> Result<()> {
    let finite = [
      self.area,
      self.production,
      self.annual_rainfall,
      self.fertilizer,
      self.pesticide,
      self.yield_per_ha,
    ]
    .iter()
    .all(|v| v.is_finite());
    if !finite {
      return Err(Error::invalid("yield record contains a non-finite value"));
    }
    if self.area <= 0.0 {
      return Err(Error::InvalidInput(format!(
        "yield record area must be positive, got {}",
        self.area
      )));
    }
    if self.yield_per_ha < 0.0 || self.fertilizer < 0.0 || self.pesticide < 0.0 {
      return Err(Error::invalid(
        "yield, fertilizer and pesticide must not be negative",
      ));
    }
    Ok(())
  }

  pub fn key(&self) -> CohortKey {
    CohortKey::new(&self.crop, &self.state, Some(&self.season))
  }

  pub fn fertilizer_per_ha(&self) -> f64 { self.fertilizer / self.area }

  pub fn pesticide_per_ha(&self) -> f64 { self.pesticide / self.area }
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Precomputed yield statistics for one cohort (tonnes per hectare).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkStat {
  pub cohort:        CohortKey,
  /// Never zero for a stored cohort.
  pub record_count:  usize,
  pub mean:          f64,
  pub median:        f64,
  pub p75:           f64,
  pub p90:           f64,
  pub min:           f64,
  pub max:           f64,
  pub std_dev:       f64,
  /// Distinct crop years, ascending.
  pub years_covered: Vec<i32>,
}

/// Means of the agronomic inputs over a set of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAverages {
  pub fertilizer_per_ha:  f64,
  pub pesticide_per_ha:   f64,
  pub annual_rainfall_mm: f64,
  pub area_ha:            f64,
  pub yield_per_ha:       f64,
}

/// Descriptive profile of the records above the top-25% threshold.
///
/// The threshold is the nearest-rank p75, which equals the maximum for any
/// cohort of fewer than 4 records. Such cohorts therefore always report an
/// empty profile, even when their best yield is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPerformerProfile {
  /// Records must yield strictly more than this to be counted.
  pub threshold:    f64,
  pub record_count: usize,
  /// `None` when no record clears the threshold.
  pub averages:     Option<InputAverages>,
}

// ─── Prediction ──────────────────────────────────────────────────────────────

/// Input snapshot for a yield prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRequest {
  pub crop:                 String,
  pub state:                String,
  pub season:               String,
  /// Hectares; must be positive.
  pub area:                 f64,
  /// Kilograms over the whole area.
  pub fertilizer:           f64,
  /// Kilograms over the whole area.
  pub pesticide:            f64,
  pub avg_temp_c:           Option<f64>,
  pub total_rainfall_mm:    Option<f64>,
  pub avg_humidity_percent: Option<f64>,
}

impl YieldRequest {
  pub fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("crop", &self.crop),
      ("state", &self.state),
      ("season", &self.season),
    ] {
      if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{name} must not be empty")));
      }
    }
    if !self.area.is_finite() || self.area <= 0.0 {
      return Err(Error::InvalidInput(format!(
        "area must be positive, got {}",
        self.area
      )));
    }
    if !self.fertilizer.is_finite() || self.fertilizer < 0.0 {
      return Err(Error::InvalidInput(format!(
        "fertilizer must not be negative, got {}",
        self.fertilizer
      )));
    }
    if !self.pesticide.is_finite() || self.pesticide < 0.0 {
      return Err(Error::InvalidInput(format!(
        "pesticide must not be negative, got {}",
        self.pesticide
      )));
    }
    let weather = [
      ("avg_temp_c", self.avg_temp_c),
      ("total_rainfall_mm", self.total_rainfall_mm),
      ("avg_humidity_percent", self.avg_humidity_percent),
    ];
    for (name, value) in weather {
      if value.is_some_and(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(format!("{name} must be finite")));
      }
    }
    if self.total_rainfall_mm.is_some_and(|v| v < 0.0) {
      return Err(Error::invalid("total_rainfall_mm must not be negative"));
    }
    if self
      .avg_humidity_percent
      .is_some_and(|v| !(0.0..=100.0).contains(&v))
    {
      return Err(Error::invalid("avg_humidity_percent must be within 0..=100"));
    }
    Ok(())
  }

  pub fn key(&self) -> CohortKey {
    CohortKey::new(&self.crop, &self.state, Some(&self.season))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
  pub low:  f64,
  pub high: f64,
}

/// How one input moved the estimate relative to its cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldFactor {
  pub feature:      String,
  pub value:        f64,
  pub cohort_mean:  f64,
  pub deviation:    f64,
  /// Estimated effect on yield, tonnes per hectare.
  pub contribution: f64,
  /// The value was filled in rather than supplied by the caller.
  pub imputed:      bool,
}

/// The outcome of one prediction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldPrediction {
  pub prediction_id:       Uuid,
  pub timestamp:           DateTime<Utc>,
  pub input:               YieldRequest,
  /// Tonnes per hectare; never negative.
  pub predicted_yield:     f64,
  pub confidence_interval: ConfidenceInterval,
  /// Ranked by absolute contribution, largest first.
  pub factors:             Vec<YieldFactor>,
  pub model_confidence:    f64,
  /// Number of historical records behind the interval estimate.
  pub cohort_records:      usize,
  /// `true` when the estimate came from cohort averages instead of a model.
  pub degraded:            bool,
}

// ─── Gap analysis ────────────────────────────────────────────────────────────

/// The five reference levels a farm is compared against. Also used for the
/// gaps, where each field is `benchmark - current`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkLevels {
  pub average:        f64,
  pub median:         f64,
  pub top_10_percent: f64,
  pub top_25_percent: f64,
  pub max:            f64,
}

impl BenchmarkLevels {
  pub fn from_stat(stat: &BenchmarkStat) -> Self {
    Self {
      average:        stat.mean,
      median:         stat.median,
      top_10_percent: stat.p90,
      top_25_percent: stat.p75,
      max:            stat.max,
    }
  }

  /// Each level minus `value`; negative entries mean `value` already beats
  /// that benchmark.
  pub fn gaps_from(&self, value: f64) -> Self {
    Self {
      average:        self.average - value,
      median:         self.median - value,
      top_10_percent: self.top_10_percent - value,
      top_25_percent: self.top_25_percent - value,
      max:            self.max - value,
    }
  }
}

/// The outcome of one gap-analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldGapResult {
  pub analysis_id:                    Uuid,
  pub timestamp:                      DateTime<Utc>,
  /// The cohort actually used; its season is `None` after relaxation.
  pub cohort:                         CohortKey,
  pub season_relaxed:                 bool,
  pub current_yield:                  f64,
  pub benchmarks:                     BenchmarkLevels,
  pub gaps:                           BenchmarkLevels,
  /// Within `[0, 100]`.
  pub percentile_rank:                f64,
  /// `max(0, top_10_percent - current_yield)`.
  pub improvement_potential:          f64,
  pub top_performers_characteristics: TopPerformerProfile,
  pub record_count:                   usize,
  pub recommendations:                Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request() -> YieldRequest {
    YieldRequest {
      crop:                 "Rice".into(),
      state:                "Punjab".into(),
      season:               "Kharif".into(),
      area:                 2.0,
      fertilizer:           200.0,
      pesticide:            4.0,
      avg_temp_c:           None,
      total_rainfall_mm:    None,
      avg_humidity_percent: None,
    }
  }

  #[test]
  fn cohort_keys_normalise() {
    let a = CohortKey::new(" Rice", "PUNJAB ", Some("Kharif     "));
    let b = CohortKey::new("rice", "punjab", Some("kharif"));
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "rice/punjab/kharif");
    assert_eq!(CohortKey::new("rice", "punjab", Some("  ")).season, None);
  }

  #[test]
  fn request_validation() {
    assert!(request().validate().is_ok());

    let mut r = request();
    r.area = 0.0;
    assert!(matches!(r.validate(), Err(Error::InvalidInput(_))));

    let mut r = request();
    r.fertilizer = -1.0;
    assert!(r.validate().is_err());

    let mut r = request();
    r.pesticide = f64::NAN;
    assert!(r.validate().is_err());

    let mut r = request();
    r.avg_humidity_percent = Some(140.0);
    assert!(r.validate().is_err());

    let mut r = request();
    r.crop = "  ".into();
    assert!(r.validate().is_err());
  }

  #[test]
  fn gaps_are_signed() {
    let levels = BenchmarkLevels {
      average:        3.3,
      median:         3.0,
      top_10_percent: 5.0,
      top_25_percent: 4.0,
      max:            5.0,
    };
    let gaps = levels.gaps_from(4.5);
    assert!(gaps.average < 0.0);
    assert!((gaps.top_10_percent - 0.5).abs() < 1e-9);
  }
}

//! [`YieldRegressor`]: point estimate, interval and confidence for one
//! yield request.
//!
//! Wraps the raw model with cohort knowledge: weather imputation from
//! historical rainfall, residual spread per (crop, state, season) cohort for
//! the interval, and a cohort-mean estimate when no model is loaded.

use std::{collections::HashMap, sync::Arc};

use agro_core::{
  Error as CoreError,
  yields::{CohortKey, ConfidenceInterval, YieldFactor, YieldRecord, YieldRequest},
};
use agro_models::{Feature, RegressorHandle, YieldFeatures, YieldModel};
use agro_reference::{BenchmarkStore, Cohort, mean};
use strum::IntoEnumIterator;

use crate::EngineConfig;

/// Everything the regressor works out for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldEstimate {
  /// Tonnes per hectare, never negative.
  pub point:            f64,
  pub interval:         ConfidenceInterval,
  pub model_confidence: f64,
  /// The model input row after imputation.
  pub features:         YieldFeatures,
  /// Sorted by descending absolute contribution.
  pub factors:          Vec<YieldFactor>,
  pub cohort_records:   usize,
  /// Set when the estimate is the cohort mean rather than a model output.
  pub degraded:         bool,
}

pub struct YieldRegressor {
  handle:          RegressorHandle,
  benchmarks:      Arc<BenchmarkStore>,
  config:          EngineConfig,
  /// Root mean squared residual of the model over each seasonal cohort.
  residual_spread: HashMap<CohortKey, f64>,
}

// ─── Construction ────────────────────────────────────────────────────────────

fn record_features(model: &dyn YieldModel, record: &YieldRecord) -> YieldFeatures {
  YieldFeatures {
    cohort:               record.key(),
    area_ha:              record.area,
    fertilizer_per_ha:    record.fertilizer_per_ha(),
    pesticide_per_ha:     record.pesticide_per_ha(),
    annual_rainfall_mm:   record.annual_rainfall,
    avg_temp_c:           model.training_mean(Feature::AvgTempC),
    avg_humidity_percent: model.training_mean(Feature::AvgHumidityPercent),
  }
}

fn residual_spread(model: &dyn YieldModel, cohort: &Cohort) -> f64 {
  let squared: Vec<f64> = cohort
    .records()
    .iter()
    .map(|r| {
      let predicted = model.predict(&record_features(model, r)).max(0.0);
      (r.yield_per_ha - predicted).powi(2)
    })
    .collect();
  mean(&squared).sqrt()
}

impl YieldRegressor {
  /// Precomputes residual spreads for every seasonal cohort when a model is
  /// available.
  pub fn new(
    handle: RegressorHandle,
    benchmarks: Arc<BenchmarkStore>,
    config: EngineConfig,
  ) -> Self {
    let residual_spread: HashMap<CohortKey, f64> = match handle.model() {
      Some(model) => benchmarks
        .cohorts()
        .filter(|c| c.key().season.is_some())
        .map(|c| (c.key().clone(), residual_spread(model, c)))
        .collect(),
      None => HashMap::new(),
    };
    tracing::debug!(
      cohorts = residual_spread.len(),
      model = handle.is_available(),
      "yield regressor ready"
    );
    Self {
      handle,
      benchmarks,
      config,
      residual_spread,
    }
  }

  pub fn is_available(&self) -> bool { self.handle.is_available() }

  pub fn config(&self) -> &EngineConfig { &self.config }
}

// ─── Prediction ──────────────────────────────────────────────────────────────

/// One model input and where its value came from.
struct Input {
  feature:  Feature,
  value:    Option<f64>,
  baseline: Option<f64>,
  imputed:  bool,
}

fn observed(request: &YieldRequest, feature: Feature) -> Option<f64> {
  match feature {
    Feature::AreaHa => Some(request.area),
    Feature::FertilizerPerHa => Some(request.fertilizer / request.area),
    Feature::PesticidePerHa => Some(request.pesticide / request.area),
    Feature::AnnualRainfallMm => request.total_rainfall_mm,
    Feature::AvgTempC => request.avg_temp_c,
    Feature::AvgHumidityPercent => request.avg_humidity_percent,
  }
}

/// The cohort's mean for `feature`, where historical records carry it.
fn cohort_mean(cohort: &Cohort, feature: Feature) -> Option<f64> {
  let avg = cohort.averages();
  match feature {
    Feature::AreaHa => Some(avg.area_ha),
    Feature::FertilizerPerHa => Some(avg.fertilizer_per_ha),
    Feature::PesticidePerHa => Some(avg.pesticide_per_ha),
    Feature::AnnualRainfallMm => Some(avg.annual_rainfall_mm),
    Feature::AvgTempC | Feature::AvgHumidityPercent => None,
  }
}

impl YieldRegressor {
  pub fn predict(&self, request: &YieldRequest) -> agro_core::Result<YieldEstimate> {
    request.validate()?;
    let key = request.key();
    let exact = self.benchmarks.get(&key);
    let cohort = exact.or_else(|| self.benchmarks.get(&key.without_season()));
    let model = self.handle.model();

    let inputs: Vec<Input> = Feature::iter()
      .map(|feature| {
        let baseline = cohort
          .and_then(|c| cohort_mean(c, feature))
          .or_else(|| model.map(|m| m.training_mean(feature)));
        match observed(request, feature) {
          Some(v) => Input {
            feature,
            value: Some(v),
            baseline,
            imputed: false,
          },
          None => Input {
            feature,
            value: baseline,
            baseline,
            imputed: true,
          },
        }
      })
      .collect();

    let value_of = |feature: Feature| {
      inputs
        .iter()
        .find(|i| i.feature == feature)
        .and_then(|i| i.value)
        .unwrap_or(0.0)
    };
    let features = YieldFeatures {
      cohort:               key.clone(),
      area_ha:              value_of(Feature::AreaHa),
      fertilizer_per_ha:    value_of(Feature::FertilizerPerHa),
      pesticide_per_ha:     value_of(Feature::PesticidePerHa),
      annual_rainfall_mm:   value_of(Feature::AnnualRainfallMm),
      avg_temp_c:           value_of(Feature::AvgTempC),
      avg_humidity_percent: value_of(Feature::AvgHumidityPercent),
    };
    let factors = explain(&inputs, model);

    let estimate = match model {
      Some(model) => {
        let point = model.predict(&features).max(0.0);
        let n = exact.map_or(0, Cohort::len);
        let (interval, model_confidence) =
          match self.residual_spread.get(&key) {
            Some(&sigma) if n >= self.config.min_cohort_samples => (
              self.interval(point, self.config.interval_z * sigma),
              self.spread_confidence(sigma, exact.map_or(point, |c| c.stat().mean)),
            ),
            _ => (self.conservative_interval(point), self.capped_confidence(n)),
          };
        YieldEstimate {
          point,
          interval,
          model_confidence,
          features,
          factors,
          cohort_records: n,
          degraded: false,
        }
      }
      None => {
        let cohort = cohort.ok_or_else(|| {
          CoreError::InsufficientData(format!(
            "no yield model and no historical records for {key}"
          ))
        })?;
        let point = cohort.stat().mean.max(0.0);
        tracing::debug!(cohort = %cohort.key(), "yield model unavailable; using cohort mean");
        YieldEstimate {
          point,
          interval: self.conservative_interval(point),
          model_confidence: self.capped_confidence(cohort.len()),
          features,
          factors,
          cohort_records: cohort.len(),
          degraded: true,
        }
      }
    };
    Ok(estimate)
  }

  fn interval(&self, point: f64, half_width: f64) -> ConfidenceInterval {
    ConfidenceInterval {
      low:  (point - half_width).max(0.0),
      high: point + half_width,
    }
  }

  fn conservative_interval(&self, point: f64) -> ConfidenceInterval {
    let half = (point * self.config.default_interval_fraction)
      .max(self.config.min_interval_width / 2.0);
    self.interval(point, half)
  }

  /// Relative residual spread mapped onto `0..=max_model_confidence`.
  fn spread_confidence(&self, sigma: f64, cohort_mean: f64) -> f64 {
    if cohort_mean <= 0.0 {
      return 0.0;
    }
    (1.0 - sigma / cohort_mean).clamp(0.0, self.config.max_model_confidence)
  }

  /// Grows with cohort size and never exceeds the low-confidence ceiling.
  fn capped_confidence(&self, cohort_records: usize) -> f64 {
    let m = self.config.min_cohort_samples as f64;
    let n = cohort_records as f64;
    (self.config.low_confidence_ceiling * (n + 1.0) / (m + 1.0))
      .min(self.config.low_confidence_ceiling)
  }
}

/// Deviation from the cohort baseline and its effect on the estimate, for
/// every input with both a value and a baseline.
fn explain(inputs: &[Input], model: Option<&dyn YieldModel>) -> Vec<YieldFactor> {
  let mut factors: Vec<YieldFactor> = inputs
    .iter()
    .filter_map(|input| {
      let value = input.value?;
      let baseline = input.baseline?;
      let deviation = value - baseline;
      let contribution =
        model.map_or(0.0, |m| m.coefficient(input.feature) * deviation);
      Some(YieldFactor {
        feature: input.feature.to_string(),
        value,
        cohort_mean: baseline,
        deviation,
        contribution,
        imputed: input.imputed,
      })
    })
    .collect();
  factors.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
  factors
}

impl std::fmt::Debug for YieldRegressor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("YieldRegressor")
      .field("handle", &self.handle)
      .field("cohorts", &self.residual_spread.len())
      .finish()
  }
}

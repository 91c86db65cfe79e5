//! [`Engine`]: async facade over both pipelines.
//!
//! Decoding and inference are CPU-bound, so every call runs on tokio's
//! blocking pool. The pipelines are shared read-only behind `Arc`s and
//! cloning an `Engine` is cheap.

use std::sync::Arc;

use agro_core::{
  disease::DiagnosisResult,
  stamp::Stamp,
  yields::{BenchmarkStat, YieldGapResult, YieldPrediction, YieldRequest},
};
use agro_models::{ClassifierHandle, RegressorHandle};
use agro_reference::{BenchmarkStore, KnowledgeBase};

use crate::{DiagnosisPipeline, EngineConfig, Result, YieldAnalytics, YieldRegressor};

#[derive(Debug, Clone)]
pub struct Engine {
  diagnosis: Arc<DiagnosisPipeline>,
  analytics: Arc<YieldAnalytics>,
}

impl Engine {
  pub fn new(diagnosis: DiagnosisPipeline, analytics: YieldAnalytics) -> Self {
    Self {
      diagnosis: Arc::new(diagnosis),
      analytics: Arc::new(analytics),
    }
  }

  /// Wire both pipelines from loaded reference data and model handles.
  /// `stamp` supplies ids and timestamps for every result.
  pub fn from_parts(
    config: EngineConfig,
    knowledge: Arc<KnowledgeBase>,
    benchmarks: Arc<BenchmarkStore>,
    classifier: ClassifierHandle,
    regressor: RegressorHandle,
    stamp: Arc<dyn Stamp>,
  ) -> Self {
    tracing::info!(
      classifier = classifier.is_available(),
      regressor = regressor.is_available(),
      diseases = knowledge.len(),
      records = benchmarks.record_count(),
      cohorts = benchmarks.cohort_count(),
      "engine starting"
    );
    let regressor = YieldRegressor::new(regressor, benchmarks.clone(), config);
    Self::new(
      DiagnosisPipeline::new(classifier, knowledge).with_stamp(stamp.clone()),
      YieldAnalytics::new(regressor, benchmarks).with_stamp(stamp),
    )
  }

  pub async fn diagnose(
    &self,
    crop_type: String,
    image: Vec<u8>,
    location: Option<String>,
    additional_symptoms: Option<String>,
  ) -> Result<DiagnosisResult> {
    let pipeline = self.diagnosis.clone();
    let result = tokio::task::spawn_blocking(move || {
      pipeline.diagnose(
        &crop_type,
        &image,
        location.as_deref(),
        additional_symptoms.as_deref(),
      )
    })
    .await??;
    Ok(result)
  }

  pub async fn predict_yield(&self, request: YieldRequest) -> Result<YieldPrediction> {
    let analytics = self.analytics.clone();
    let prediction =
      tokio::task::spawn_blocking(move || analytics.predict_yield(&request))
        .await??;
    Ok(prediction)
  }

  pub async fn analyze_gap(
    &self,
    crop: String,
    state: String,
    season: Option<String>,
    current_yield: f64,
  ) -> Result<YieldGapResult> {
    let analytics = self.analytics.clone();
    let gap = tokio::task::spawn_blocking(move || {
      analytics.analyze_gap(&crop, &state, season.as_deref(), current_yield)
    })
    .await??;
    Ok(gap)
  }

  /// Benchmarks are precomputed, so this skips the blocking pool.
  pub fn get_benchmarks(
    &self,
    crop: &str,
    state: &str,
    season: Option<&str>,
  ) -> Result<BenchmarkStat> {
    Ok(self.analytics.get_benchmarks(crop, state, season)?)
  }
}

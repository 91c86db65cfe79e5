//! [`YieldAnalytics`]: yield prediction, gap analysis and benchmarks.

use std::sync::Arc;

use agro_core::{
  Error as CoreError,
  stamp::{Stamp, SystemStamp},
  yields::{
    BenchmarkLevels,
    BenchmarkStat,
    YieldGapResult,
    YieldPrediction,
    YieldRequest,
  },
};
use agro_reference::{BenchmarkStore, Cohort, CohortMatch};

use crate::YieldRegressor;

pub struct YieldAnalytics {
  regressor:  YieldRegressor,
  benchmarks: Arc<BenchmarkStore>,
  stamp:      Arc<dyn Stamp>,
}

fn require_text(field: &str, value: &str) -> agro_core::Result<()> {
  if value.trim().is_empty() {
    return Err(CoreError::InvalidInput(format!("{field} must not be empty")));
  }
  Ok(())
}

impl YieldAnalytics {
  pub fn new(regressor: YieldRegressor, benchmarks: Arc<BenchmarkStore>) -> Self {
    Self {
      regressor,
      benchmarks,
      stamp: Arc::new(SystemStamp),
    }
  }

  pub fn with_stamp(mut self, stamp: Arc<dyn Stamp>) -> Self {
    self.stamp = stamp;
    self
  }

  /// Predict yield for one field and explain the inputs that drove it.
  pub fn predict_yield(
    &self,
    request: &YieldRequest,
  ) -> agro_core::Result<YieldPrediction> {
    let estimate = self.regressor.predict(request)?;
    tracing::info!(
      cohort = %request.key(),
      predicted = estimate.point,
      confidence = estimate.model_confidence,
      degraded = estimate.degraded,
      "yield predicted"
    );
    Ok(YieldPrediction {
      prediction_id:       self.stamp.next_id(),
      timestamp:           self.stamp.now(),
      input:               request.clone(),
      predicted_yield:     estimate.point,
      confidence_interval: estimate.interval,
      factors:             estimate.factors,
      model_confidence:    estimate.model_confidence,
      cohort_records:      estimate.cohort_records,
      degraded:            estimate.degraded,
    })
  }

  /// Compare `current_yield` with the historical cohort.
  pub fn analyze_gap(
    &self,
    crop: &str,
    state: &str,
    season: Option<&str>,
    current_yield: f64,
  ) -> agro_core::Result<YieldGapResult> {
    require_text("crop", crop)?;
    require_text("state", state)?;
    if !current_yield.is_finite() || current_yield < 0.0 {
      return Err(CoreError::InvalidInput(format!(
        "current_yield must be a non-negative number, got {current_yield}"
      )));
    }

    let CohortMatch { cohort, relaxed } =
      self.benchmarks.resolve(crop, state, season)?;
    let benchmarks = BenchmarkLevels::from_stat(cohort.stat());
    let percentile_rank = cohort.percentile_rank(current_yield);
    let improvement_potential =
      (benchmarks.top_10_percent - current_yield).max(0.0);
    let recommendations = self.gap_recommendations(
      cohort,
      relaxed.then_some(season).flatten(),
      current_yield,
      percentile_rank,
      improvement_potential,
    );

    tracing::info!(
      cohort = %cohort.key(),
      relaxed,
      current_yield,
      percentile_rank,
      "yield gap analysed"
    );

    Ok(YieldGapResult {
      analysis_id: self.stamp.next_id(),
      timestamp: self.stamp.now(),
      cohort: cohort.key().clone(),
      season_relaxed: relaxed,
      current_yield,
      gaps: benchmarks.gaps_from(current_yield),
      benchmarks,
      percentile_rank,
      improvement_potential,
      top_performers_characteristics: cohort.top_performers().clone(),
      record_count: cohort.len(),
      recommendations,
    })
  }

  /// Aggregates for the resolved cohort.
  pub fn get_benchmarks(
    &self,
    crop: &str,
    state: &str,
    season: Option<&str>,
  ) -> agro_core::Result<BenchmarkStat> {
    require_text("crop", crop)?;
    require_text("state", state)?;
    let found = self.benchmarks.resolve(crop, state, season)?;
    Ok(found.cohort.stat().clone())
  }

  fn gap_recommendations(
    &self,
    cohort: &Cohort,
    relaxed_season: Option<&str>,
    current_yield: f64,
    percentile_rank: f64,
    improvement_potential: f64,
  ) -> Vec<String> {
    let key = cohort.key();
    let stat = cohort.stat();
    let mut out = Vec::new();

    if let Some(season) = relaxed_season {
      out.push(format!(
        "No records for the {} season; compared against all seasons for {} in {}",
        season.trim(),
        key.crop,
        key.state
      ));
    }
    if cohort.len() < self.regressor.config().min_cohort_samples {
      out.push(format!(
        "Benchmark is based on only {} records; treat comparisons with caution",
        cohort.len()
      ));
    }

    out.push(match percentile_rank {
      p if p >= 90.0 => {
        "Your yield is in the top 10% of the cohort; maintain current practices"
          .to_owned()
      }
      p if p >= 75.0 => format!(
        "Your yield is in the top quarter; {:.2} t/ha more reaches the top 10%",
        (stat.p90 - current_yield).max(0.0)
      ),
      p if p >= 50.0 => format!(
        "Your yield is above the median; {:.2} t/ha more reaches the top quarter",
        (stat.p75 - current_yield).max(0.0)
      ),
      p if p >= 25.0 => format!(
        "Your yield is below the median of {:.2} t/ha; review input use and timing",
        stat.median
      ),
      _ => format!(
        "Your yield is in the bottom quarter; the cohort average is {:.2} t/ha. \
         Consider a soil test and advice from an extension officer",
        stat.mean
      ),
    });

    if improvement_potential > 0.0 {
      out.push(format!(
        "Reaching the top 10% benchmark would add {improvement_potential:.2} t/ha"
      ));
    }

    let top = cohort.top_performers();
    if let Some(avg) = &top.averages {
      let all = cohort.averages();
      out.push(format!(
        "Fields yielding above {:.2} t/ha average {:.1} kg/ha fertilizer and \
         {:.2} kg/ha pesticide with {:.0} mm rainfall",
        top.threshold,
        avg.fertilizer_per_ha,
        avg.pesticide_per_ha,
        avg.annual_rainfall_mm
      ));
      if avg.fertilizer_per_ha > all.fertilizer_per_ha * 1.1 {
        out.push(
          "Top performers apply noticeably more fertilizer than the cohort \
           average; check nutrient supply"
            .to_owned(),
        );
      }
    }
    out
  }
}

impl std::fmt::Debug for YieldAnalytics {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("YieldAnalytics")
      .field("regressor", &self.regressor)
      .field("records", &self.benchmarks.record_count())
      .finish()
  }
}

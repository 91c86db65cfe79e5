//! [`BenchmarkStore`]: historical yields grouped into cohorts.
//!
//! Every record lands in two cohorts: its exact (crop, state, season) key and
//! the season-less (crop, state) key. Aggregates are computed once in
//! [`BenchmarkStore::from_records`]; lookups afterwards are plain map reads.

use std::collections::{BTreeSet, HashMap};

use agro_core::{
  Error as CoreError,
  yields::{BenchmarkStat, CohortKey, InputAverages, TopPerformerProfile, YieldRecord},
};

use crate::{
  Result,
  stats::{mean, median, nearest_rank, percentile_rank, std_dev},
};

// ─── Cohort ──────────────────────────────────────────────────────────────────

/// One reference population with its precomputed aggregates.
#[derive(Debug, Clone)]
pub struct Cohort {
  stat:           BenchmarkStat,
  sorted_yields:  Vec<f64>,
  averages:       InputAverages,
  top_performers: TopPerformerProfile,
  records:        Vec<YieldRecord>,
}

impl Cohort {
  /// `records` must be non-empty.
  fn build(key: CohortKey, records: Vec<YieldRecord>) -> Self {
    let mut sorted_yields: Vec<f64> =
      records.iter().map(|r| r.yield_per_ha).collect();
    sorted_yields.sort_by(f64::total_cmp);

    let years_covered: BTreeSet<i32> =
      records.iter().map(|r| r.crop_year).collect();

    let avg = mean(&sorted_yields);
    let stat = BenchmarkStat {
      cohort:        key,
      record_count:  records.len(),
      mean:          avg,
      median:        median(&sorted_yields),
      p75:           nearest_rank(&sorted_yields, 75.0),
      p90:           nearest_rank(&sorted_yields, 90.0),
      min:           sorted_yields.first().copied().unwrap_or(0.0),
      max:           sorted_yields.last().copied().unwrap_or(0.0),
      std_dev:       std_dev(&sorted_yields, avg),
      years_covered: years_covered.into_iter().collect(),
    };

    let averages = input_averages(records.iter()).unwrap_or(InputAverages {
      fertilizer_per_ha:  0.0,
      pesticide_per_ha:   0.0,
      annual_rainfall_mm: 0.0,
      area_ha:            0.0,
      yield_per_ha:       0.0,
    });

    let threshold = stat.p75;
    let above: Vec<&YieldRecord> = records
      .iter()
      .filter(|r| r.yield_per_ha > threshold)
      .collect();
    let top_performers = TopPerformerProfile {
      threshold,
      record_count: above.len(),
      averages: input_averages(above.into_iter()),
    };

    Self {
      stat,
      sorted_yields,
      averages,
      top_performers,
      records,
    }
  }

  pub fn key(&self) -> &CohortKey { &self.stat.cohort }

  pub fn stat(&self) -> &BenchmarkStat { &self.stat }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn records(&self) -> &[YieldRecord] { &self.records }

  /// Means of every input over the whole cohort.
  pub fn averages(&self) -> &InputAverages { &self.averages }

  pub fn top_performers(&self) -> &TopPerformerProfile { &self.top_performers }

  /// Share of the cohort yielding at or below `value`, in `0..=100`.
  pub fn percentile_rank(&self, value: f64) -> f64 {
    percentile_rank(&self.sorted_yields, value)
  }
}

fn input_averages<'a>(
  records: impl Iterator<Item = &'a YieldRecord>,
) -> Option<InputAverages> {
  let mut n = 0usize;
  let mut sums = [0.0f64; 5];
  for r in records {
    n += 1;
    sums[0] += r.fertilizer_per_ha();
    sums[1] += r.pesticide_per_ha();
    sums[2] += r.annual_rainfall;
    sums[3] += r.area;
    sums[4] += r.yield_per_ha;
  }
  if n == 0 {
    return None;
  }
  let n = n as f64;
  Some(InputAverages {
    fertilizer_per_ha:  sums[0] / n,
    pesticide_per_ha:   sums[1] / n,
    annual_rainfall_mm: sums[2] / n,
    area_ha:            sums[3] / n,
    yield_per_ha:       sums[4] / n,
  })
}

// ─── Lookup result ───────────────────────────────────────────────────────────

/// A resolved cohort and whether the season filter had to be dropped.
#[derive(Debug, Clone, Copy)]
pub struct CohortMatch<'a> {
  pub cohort:  &'a Cohort,
  pub relaxed: bool,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Immutable store of historical yield cohorts.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkStore {
  cohorts:      HashMap<CohortKey, Cohort>,
  record_count: usize,
}

impl BenchmarkStore {
  /// Validate every record, group into cohorts and precompute aggregates.
  pub fn from_records(
    records: impl IntoIterator<Item = YieldRecord>,
  ) -> Result<Self> {
    let mut groups: HashMap<CohortKey, Vec<YieldRecord>> = HashMap::new();
    let mut record_count = 0;

    for record in records {
      record.validate()?;
      let key = record.key();
      groups
        .entry(key.without_season())
        .or_default()
        .push(record.clone());
      groups.entry(key).or_default().push(record);
      record_count += 1;
    }

    let cohorts: HashMap<CohortKey, Cohort> = groups
      .into_iter()
      .map(|(key, records)| (key.clone(), Cohort::build(key, records)))
      .collect();

    tracing::info!(
      records = record_count,
      cohorts = cohorts.len(),
      "benchmark store loaded"
    );

    Ok(Self {
      cohorts,
      record_count,
    })
  }

  pub fn record_count(&self) -> usize { self.record_count }

  pub fn cohort_count(&self) -> usize { self.cohorts.len() }

  pub fn cohorts(&self) -> impl Iterator<Item = &Cohort> {
    self.cohorts.values()
  }

  /// Exact lookup; no relaxation.
  pub fn get(&self, key: &CohortKey) -> Option<&Cohort> {
    self.cohorts.get(key)
  }

  /// Resolve a cohort, relaxing the season filter when the exact cohort is
  /// empty.
  ///
  /// Fails with [`CoreError::InsufficientData`] when nothing matches the crop
  /// and state at all.
  pub fn resolve(
    &self,
    crop: &str,
    state: &str,
    season: Option<&str>,
  ) -> agro_core::Result<CohortMatch<'_>> {
    let key = CohortKey::new(crop, state, season);

    if key.season.is_some()
      && let Some(cohort) = self.cohorts.get(&key)
    {
      return Ok(CohortMatch {
        cohort,
        relaxed: false,
      });
    }

    let broad = key.without_season();
    match self.cohorts.get(&broad) {
      Some(cohort) => {
        let relaxed = key.season.is_some();
        if relaxed {
          tracing::warn!(cohort = %key, "no records for season; using crop and state only");
        }
        Ok(CohortMatch { cohort, relaxed })
      }
      None => Err(CoreError::InsufficientData(format!(
        "no historical records for crop {:?} in {:?}",
        broad.crop, broad.state
      ))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(season: &str, year: i32, yield_per_ha: f64) -> YieldRecord {
    YieldRecord {
      crop: "Rice".into(),
      crop_year: year,
      season: season.into(),
      state: "Punjab".into(),
      area: 10.0,
      production: yield_per_ha * 10.0,
      annual_rainfall: 700.0,
      fertilizer: 1_000.0 + yield_per_ha * 100.0,
      pesticide: 20.0,
      yield_per_ha,
    }
  }

  fn store() -> BenchmarkStore {
    let kharif = [2.0, 2.5, 3.0, 4.0, 5.0]
      .into_iter()
      .enumerate()
      .map(|(i, y)| record("Kharif     ", 2010 + i as i32, y));
    let rabi = [1.0, 1.5].into_iter().map(|y| record("Rabi", 2012, y));
    BenchmarkStore::from_records(kharif.chain(rabi)).unwrap()
  }

  #[test]
  fn exact_cohort_aggregates() {
    let store = store();
    let m = store.resolve("rice", "PUNJAB", Some("kharif")).unwrap();
    assert!(!m.relaxed);

    let stat = m.cohort.stat();
    assert_eq!(stat.record_count, 5);
    assert!((stat.mean - 3.3).abs() < 1e-9);
    assert_eq!(stat.median, 3.0);
    assert_eq!(stat.p75, 4.0);
    assert_eq!(stat.p90, 5.0);
    assert_eq!(stat.max, 5.0);
    assert_eq!(stat.years_covered, vec![2010, 2011, 2012, 2013, 2014]);
    assert_eq!(m.cohort.percentile_rank(3.0), 60.0);
  }

  #[test]
  fn season_is_relaxed_to_crop_and_state() {
    let store = store();
    let m = store.resolve("Rice", "Punjab", Some("Zaid")).unwrap();
    assert!(m.relaxed);
    assert_eq!(m.cohort.len(), 7);
    assert_eq!(m.cohort.key().season, None);

    let m = store.resolve("Rice", "Punjab", None).unwrap();
    assert!(!m.relaxed);
    assert_eq!(m.cohort.len(), 7);
  }

  #[test]
  fn missing_crop_state_is_insufficient_data() {
    let store = store();
    let err = store.resolve("Rice", "Kerala", Some("Kharif")).unwrap_err();
    assert!(matches!(err, CoreError::InsufficientData(_)));
  }

  #[test]
  fn top_performers_are_strictly_above_p75() {
    let store = store();
    let m = store.resolve("Rice", "Punjab", Some("Kharif")).unwrap();
    let top = m.cohort.top_performers();
    assert_eq!(top.threshold, 4.0);
    assert_eq!(top.record_count, 1);
    let avg = top.averages.as_ref().unwrap();
    assert_eq!(avg.yield_per_ha, 5.0);
    assert!((avg.fertilizer_per_ha - 150.0).abs() < 1e-9);
  }

  #[test]
  fn flat_cohort_has_no_top_performers() {
    let store =
      BenchmarkStore::from_records((0..4).map(|i| record("Rabi", 2000 + i, 2.0)))
        .unwrap();
    let m = store.resolve("rice", "punjab", Some("rabi")).unwrap();
    assert_eq!(m.cohort.top_performers().record_count, 0);
    assert!(m.cohort.top_performers().averages.is_none());
  }

  #[test]
  fn small_cohort_has_no_top_performers() {
    let store = BenchmarkStore::from_records([
      record("Rabi", 2001, 2.0),
      record("Rabi", 2002, 3.0),
      record("Rabi", 2003, 6.0),
    ])
    .unwrap();
    let m = store.resolve("Rice", "Punjab", Some("Rabi")).unwrap();
    let top = m.cohort.top_performers();
    assert_eq!(top.threshold, 6.0);
    assert_eq!(top.threshold, m.cohort.stat().max);
    assert_eq!(top.record_count, 0);
    assert!(top.averages.is_none());
  }

  #[test]
  fn invalid_records_are_rejected() {
    let mut bad = record("Kharif", 2010, 2.0);
    bad.area = 0.0;
    assert!(BenchmarkStore::from_records([bad]).is_err());
  }
}

//! Descriptive statistics over yield samples.
//!
//! Functions taking `sorted` expect ascending input without NaNs; callers in
//! this crate sort once when a cohort is built.

pub fn mean(values: &[f64]) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(sorted: &[f64]) -> f64 {
  let n = sorted.len();
  match n {
    0 => 0.0,
    _ if n % 2 == 0 => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    _ => sorted[n / 2],
  }
}

/// Population standard deviation.
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let variance = values
    .iter()
    .map(|v| {
      let diff = v - mean;
      diff * diff
    })
    .sum::<f64>()
    / values.len() as f64;
  variance.sqrt()
}

/// Nearest-rank percentile: the value at rank `ceil(pct / 100 * n)`.
///
/// Always returns an observed value, so the 90th percentile of five samples
/// is the largest one.
pub fn nearest_rank(sorted: &[f64], pct: f64) -> f64 {
  let n = sorted.len();
  if n == 0 {
    return 0.0;
  }
  let rank = (pct.clamp(0.0, 100.0) / 100.0 * n as f64).ceil() as usize;
  sorted[rank.clamp(1, n) - 1]
}

/// Share of samples at or below `value`, scaled to `0..=100`.
///
/// Ties count as "at or below", which keeps the function monotonic.
pub fn percentile_rank(sorted: &[f64], value: f64) -> f64 {
  if sorted.is_empty() {
    return 0.0;
  }
  let at_or_below = sorted.partition_point(|y| *y <= value);
  at_or_below as f64 / sorted.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
  use super::*;

  const COHORT: [f64; 5] = [2.0, 2.5, 3.0, 4.0, 5.0];

  #[test]
  fn basic_stats() {
    assert!((mean(&COHORT) - 3.3).abs() < 1e-9);
    assert_eq!(median(&COHORT), 3.0);
    assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    assert_eq!(std_dev(&[2.0, 2.0, 2.0], 2.0), 0.0);
    assert_eq!(mean(&[]), 0.0);
  }

  #[test]
  fn nearest_rank_picks_observed_values() {
    assert_eq!(nearest_rank(&COHORT, 90.0), 5.0);
    assert_eq!(nearest_rank(&COHORT, 75.0), 4.0);
    assert_eq!(nearest_rank(&COHORT, 50.0), 3.0);
    assert_eq!(nearest_rank(&COHORT, 0.0), 2.0);
    assert_eq!(nearest_rank(&[7.0], 90.0), 7.0);
  }

  #[test]
  fn percentile_rank_counts_ties_inclusively() {
    assert_eq!(percentile_rank(&COHORT, 3.0), 60.0);
    assert_eq!(percentile_rank(&COHORT, 1.0), 0.0);
    assert_eq!(percentile_rank(&COHORT, 5.0), 100.0);
    assert_eq!(percentile_rank(&[2.0, 2.0, 2.0, 4.0], 2.0), 75.0);
  }

  #[test]
  fn percentile_rank_is_monotonic() {
    let mut last = 0.0;
    let mut value = 0.0;
    while value <= 6.0 {
      let rank = percentile_rank(&COHORT, value);
      assert!(rank >= last);
      assert!((0.0..=100.0).contains(&rank));
      last = rank;
      value += 0.05;
    }
    assert_eq!(last, 100.0);
  }
}

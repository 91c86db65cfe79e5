//! Integration tests for `SqliteStore` against an in-memory database.

use agro_core::{stamp::FixedStamp, yields::YieldRecord};
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn record(crop: &str, season: &str, year: i32, yield_per_ha: f64) -> YieldRecord {
  YieldRecord {
    crop: crop.into(),
    crop_year: year,
    season: season.into(),
    state: "Punjab".into(),
    area: 12.5,
    production: yield_per_ha * 12.5,
    annual_rainfall: 780.0,
    fertilizer: 1500.0,
    pesticide: 20.0,
    yield_per_ha,
  }
}

#[tokio::test]
async fn import_and_load_round_trip() {
  let s = store().await;
  let records = vec![
    record("Rice", "Kharif", 2019, 3.1),
    record("Rice", "Kharif", 2018, 2.9),
    record("Wheat", "Rabi", 2019, 4.2),
  ];

  let batch = s.import_records("crop_yield.json", records.clone()).await.unwrap();
  assert_eq!(batch.record_count, 3);
  assert_eq!(batch.source, "crop_yield.json");
  assert_eq!(s.count().await.unwrap(), 3);

  let loaded = s.load_records().await.unwrap();
  assert_eq!(loaded.len(), 3);
  // Ordered by crop, state, season, year.
  assert_eq!(loaded[0], records[1]);
  assert_eq!(loaded[1], records[0]);
  assert_eq!(loaded[2], records[2]);
}

#[tokio::test]
async fn duplicates_are_skipped() {
  let s = store().await;
  s.import_records("first", vec![record("Rice", "Kharif", 2019, 3.1)])
    .await
    .unwrap();

  let again = s
    .import_records("second", vec![
      record(" rice ", "KHARIF", 2019, 9.9),
      record("Rice", "Kharif", 2020, 3.4),
    ])
    .await
    .unwrap();
  assert_eq!(again.record_count, 1);
  assert_eq!(s.count().await.unwrap(), 2);

  let loaded = s.load_records().await.unwrap();
  assert!(loaded.iter().all(|r| r.yield_per_ha != 9.9));
}

#[tokio::test]
async fn uniqueness_folds_ascii_case_only() {
  let s = store().await;
  let batch = s
    .import_records("mixed", vec![
      record("Rice", "Kharif", 2019, 3.1),
      record("RICE", "kharif", 2019, 3.2),
      record("Éleusine", "Kharif", 2019, 1.1),
      record("éleusine", "Kharif", 2019, 1.2),
    ])
    .await
    .unwrap();
  assert_eq!(batch.record_count, 3);
  assert_eq!(s.count().await.unwrap(), 3);
}

#[tokio::test]
async fn invalid_batch_writes_nothing() {
  let s = store().await;
  let mut bad = record("Rice", "Kharif", 2020, 3.0);
  bad.area = 0.0;

  let err = s
    .import_records("bad", vec![record("Rice", "Kharif", 2019, 3.1), bad])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(agro_core::Error::InvalidInput(_))));
  assert_eq!(s.count().await.unwrap(), 0);
  assert!(s.list_batches().await.unwrap().is_empty());
}

#[tokio::test]
async fn batches_are_listed_with_their_stamp() {
  let s = store().await;
  let stamp = FixedStamp {
    id: Uuid::from_u128(42),
    at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
  };
  s.import_records_stamped(
    "seed",
    vec![record("Maize", "Kharif", 2017, 2.2)],
    &stamp,
  )
  .await
  .unwrap();

  let batches = s.list_batches().await.unwrap();
  assert_eq!(batches.len(), 1);
  assert_eq!(batches[0].batch_id, Uuid::from_u128(42));
  assert_eq!(batches[0].imported_at, stamp.at);
  assert_eq!(batches[0].record_count, 1);
}

#[tokio::test]
async fn empty_store_loads_nothing() {
  let s = store().await;
  assert_eq!(s.count().await.unwrap(), 0);
  assert!(s.load_records().await.unwrap().is_empty());
}

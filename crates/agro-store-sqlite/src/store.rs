//! [`SqliteStore`]: historical yield records in a single SQLite file.

use std::path::Path;

use agro_core::{
  stamp::{Stamp, SystemStamp},
  yields::YieldRecord,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Result,
  encode::{RECORD_COLUMNS, RawBatch, encode_dt, encode_uuid, record_from_row, trimmed},
  schema::SCHEMA,
};

/// One call to [`SqliteStore::import_records`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImportBatch {
  pub batch_id:     Uuid,
  pub imported_at:  DateTime<Utc>,
  pub source:       String,
  /// Rows inserted; duplicates of existing rows are not counted.
  pub record_count: usize,
}

/// Reference data store. Cloning is cheap; the connection is shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Validate and insert `records` in one transaction.
  ///
  /// A record whose (crop, state, season, year) already exists is skipped.
  /// Nothing is written if any record fails validation.
  pub async fn import_records(
    &self,
    source: &str,
    records: Vec<YieldRecord>,
  ) -> Result<ImportBatch> {
    self.import_records_stamped(source, records, &SystemStamp).await
  }

  pub async fn import_records_stamped(
    &self,
    source: &str,
    records: Vec<YieldRecord>,
    stamp: &dyn Stamp,
  ) -> Result<ImportBatch> {
    for record in &records {
      record.validate()?;
    }
    let records: Vec<YieldRecord> = records.into_iter().map(trimmed).collect();
    let total = records.len();

    let batch_id = stamp.next_id();
    let imported_at = stamp.now();
    let batch_id_str = encode_uuid(batch_id);
    let imported_at_str = encode_dt(imported_at);
    let source_str = source.to_owned();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO import_batches (batch_id, imported_at, source, record_count)
           VALUES (?1, ?2, ?3, 0)",
          rusqlite::params![batch_id_str, imported_at_str, source_str],
        )?;

        let mut inserted = 0usize;
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO yield_records (
               crop, crop_year, season, state, area, production,
               annual_rainfall, fertilizer, pesticide, yield_per_ha, batch_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          )?;
          for r in &records {
            inserted += stmt.execute(rusqlite::params![
              r.crop,
              r.crop_year,
              r.season,
              r.state,
              r.area,
              r.production,
              r.annual_rainfall,
              r.fertilizer,
              r.pesticide,
              r.yield_per_ha,
              batch_id_str,
            ])?;
          }
        }

        tx.execute(
          "UPDATE import_batches SET record_count = ?1 WHERE batch_id = ?2",
          rusqlite::params![inserted as i64, batch_id_str],
        )?;
        tx.commit()?;
        Ok(inserted)
      })
      .await?;

    tracing::info!(
      %batch_id,
      source,
      inserted,
      skipped = total - inserted,
      "yield records imported"
    );

    Ok(ImportBatch {
      batch_id,
      imported_at,
      source: source.to_owned(),
      record_count: inserted,
    })
  }

  /// Every stored record, ordered by crop, state, season and year.
  pub async fn load_records(&self) -> Result<Vec<YieldRecord>> {
    let records = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM yield_records
           ORDER BY crop, state, season, crop_year"
        ))?;
        let rows = stmt
          .query_map([], record_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(records)
  }

  pub async fn count(&self) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM yield_records", [], |r| {
          r.get(0)
        })?)
      })
      .await?;
    Ok(usize::try_from(n).unwrap_or(0))
  }

  /// Import history, oldest first.
  pub async fn list_batches(&self) -> Result<Vec<ImportBatch>> {
    let raws: Vec<RawBatch> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT batch_id, imported_at, source, record_count
           FROM import_batches ORDER BY imported_at, batch_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawBatch {
              batch_id:     row.get(0)?,
              imported_at:  row.get(1)?,
              source:       row.get(2)?,
              record_count: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawBatch::into_batch).collect()
  }
}

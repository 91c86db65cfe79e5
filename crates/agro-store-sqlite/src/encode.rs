//! Conversions between domain types and SQLite column values.
//!
//! Timestamps are RFC 3339 strings and UUIDs are hyphenated lowercase
//! strings. Yield records map column for column.

use agro_core::yields::YieldRecord;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result, store::ImportBatch};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Yield records ───────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that feeds [`record_from_row`].
pub const RECORD_COLUMNS: &str = "crop, crop_year, season, state, area, \
   production, annual_rainfall, fertilizer, pesticide, yield_per_ha";

pub fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<YieldRecord> {
  Ok(YieldRecord {
    crop:            row.get(0)?,
    crop_year:       row.get(1)?,
    season:          row.get(2)?,
    state:           row.get(3)?,
    area:            row.get(4)?,
    production:      row.get(5)?,
    annual_rainfall: row.get(6)?,
    fertilizer:      row.get(7)?,
    pesticide:       row.get(8)?,
    yield_per_ha:    row.get(9)?,
  })
}

/// Text fields are stored trimmed so lookups and the uniqueness constraint
/// ignore stray whitespace.
pub fn trimmed(record: YieldRecord) -> YieldRecord {
  YieldRecord {
    crop: record.crop.trim().to_owned(),
    season: record.season.trim().to_owned(),
    state: record.state.trim().to_owned(),
    ..record
  }
}

// ─── Import batches ──────────────────────────────────────────────────────────

/// Raw strings read directly from an `import_batches` row.
pub struct RawBatch {
  pub batch_id:     String,
  pub imported_at:  String,
  pub source:       String,
  pub record_count: i64,
}

impl RawBatch {
  pub fn into_batch(self) -> Result<ImportBatch> {
    Ok(ImportBatch {
      batch_id:     decode_uuid(&self.batch_id)?,
      imported_at:  decode_dt(&self.imported_at)?,
      source:       self.source,
      record_count: usize::try_from(self.record_count).unwrap_or(0),
    })
  }
}

//! SQL schema for the reference store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS import_batches (
    batch_id     TEXT PRIMARY KEY,
    imported_at  TEXT NOT NULL,    -- RFC 3339 UTC
    source       TEXT NOT NULL,    -- file name or other free-form origin
    record_count INTEGER NOT NULL  -- rows actually inserted
);

-- One row per (crop, state, season, year). Re-imports keep the first row.
-- NOCASE folds ASCII letters only: "Rice" and "RICE" collide here, but
-- non-ASCII names differing in case are stored as separate rows and only
-- merge later, when cohort keys are lowercased in memory.
CREATE TABLE IF NOT EXISTS yield_records (
    crop            TEXT    NOT NULL COLLATE NOCASE,
    crop_year       INTEGER NOT NULL,
    season          TEXT    NOT NULL COLLATE NOCASE,
    state           TEXT    NOT NULL COLLATE NOCASE,
    area            REAL    NOT NULL CHECK (area > 0),
    production      REAL    NOT NULL,
    annual_rainfall REAL    NOT NULL,
    fertilizer      REAL    NOT NULL CHECK (fertilizer >= 0),
    pesticide       REAL    NOT NULL CHECK (pesticide >= 0),
    yield_per_ha    REAL    NOT NULL CHECK (yield_per_ha >= 0),
    batch_id        TEXT    NOT NULL REFERENCES import_batches(batch_id),
    UNIQUE (crop, state, season, crop_year)
);

CREATE INDEX IF NOT EXISTS yield_records_cohort_idx
    ON yield_records(crop, state, season);

PRAGMA user_version = 1;
"#;

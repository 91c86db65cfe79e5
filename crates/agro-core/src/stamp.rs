//! Identity and time source for result objects.
//!
//! The id and the timestamp are the only non-deterministic parts of a
//! pipeline call. Pipelines take a [`Stamp`] so tests can pin both.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait Stamp: Send + Sync {
  fn next_id(&self) -> Uuid;
  fn now(&self) -> DateTime<Utc>;
}

/// Random v4 ids and the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStamp;

impl Stamp for SystemStamp {
  fn next_id(&self) -> Uuid { Uuid::new_v4() }

  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// Always hands out the same id and timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedStamp {
  pub id: Uuid,
  pub at: DateTime<Utc>,
}

impl Stamp for FixedStamp {
  fn next_id(&self) -> Uuid { self.id }

  fn now(&self) -> DateTime<Utc> { self.at }
}

//! Error type for `agro-reference`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] agro_core::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("duplicate disease id: {0:?}")]
  DuplicateDisease(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

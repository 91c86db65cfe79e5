//! Error type for `agro-models`. Only artifact loading uses it; inference
//! reports through [`agro_core::Error`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] agro_core::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid artifact: {0}")]
  Artifact(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

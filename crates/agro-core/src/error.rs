//! Error types for `agro-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A request field is missing, malformed or out of range.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The model artifact behind a handle failed to load at startup.
  #[error("model unavailable: {0}")]
  ModelUnavailable(String),

  /// The classifier produced an id the knowledge base does not know.
  #[error("unknown disease: {0:?}")]
  UnknownDisease(String),

  /// No historical records match the requested cohort.
  #[error("insufficient data: {0}")]
  InsufficientData(String),

  #[error("model artifact error: {0}")]
  Artifact(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn invalid(msg: impl Into<String>) -> Self {
    Self::InvalidInput(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

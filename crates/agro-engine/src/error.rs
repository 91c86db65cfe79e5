//! Error type for the async [`Engine`](crate::Engine) facade.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] agro_core::Error),

  #[error("inference task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

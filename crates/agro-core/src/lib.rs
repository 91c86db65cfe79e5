//! Core types for the agronomic prediction workspace.
//!
//! This crate is deliberately free of image, model and database
//! dependencies. Every other crate depends on it; it depends on nothing
//! heavier than `serde`.

pub mod disease;
pub mod error;
pub mod stamp;
pub mod yields;

pub use error::{Error, Result};

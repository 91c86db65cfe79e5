//! Read-only reference data for the prediction pipelines.
//!
//! Both collections are built once at startup and shared behind an `Arc`;
//! nothing in this crate mutates after construction.

mod stats;

pub mod benchmark;
pub mod error;
pub mod knowledge;

pub use benchmark::{BenchmarkStore, Cohort, CohortMatch};
pub use error::{Error, Result};
pub use knowledge::KnowledgeBase;
pub use stats::{mean, median, nearest_rank, percentile_rank, std_dev};

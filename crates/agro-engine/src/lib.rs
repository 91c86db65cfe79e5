//! The agronomic prediction pipelines.
//!
//! [`DiagnosisPipeline`] turns a leaf photo into a diagnosis and treatment
//! plan. [`YieldAnalytics`] predicts yield and benchmarks it against the
//! historical cohort. [`Engine`] bundles both behind an async facade that
//! runs inference on the blocking thread pool.
//!
//! Transport, request schemas and persistence belong to the caller.

mod advisory;

pub mod analytics;
pub mod config;
pub mod diagnosis;
pub mod error;
pub mod regressor;
pub mod service;
pub mod severity;

pub use analytics::YieldAnalytics;
pub use config::EngineConfig;
pub use diagnosis::DiagnosisPipeline;
pub use error::{Error, Result};
pub use regressor::{YieldEstimate, YieldRegressor};
pub use service::Engine;

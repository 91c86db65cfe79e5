//! Inference-only model wrappers.
//!
//! Models are loaded once from JSON artifacts. A failed load yields an
//! `Unavailable` handle that stays unavailable for the life of the process;
//! pipelines check the handle and take their degraded path.

pub mod classifier;
pub mod error;
pub mod features;
pub mod regressor;

pub use classifier::{ClassifierHandle, DiseaseClassifier, LeafColourClassifier};
pub use error::{Error, Result};
pub use features::decode_image;
pub use regressor::{Feature, LinearYieldModel, RegressorHandle, YieldFeatures, YieldModel};

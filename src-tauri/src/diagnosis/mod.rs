//! Leaf photo diagnosis: image preparation, the remote classifier, and
//! the disease catalog used to describe its answers.

pub mod catalog;
pub mod client;
pub mod image_prep;
pub mod types;

pub use catalog::{DiseaseCatalog, DiseaseInfo, PlantGroup};
pub use client::{InferenceClient, RetryPolicy};
pub use image_prep::{prepare_image, PreparedImage};
pub use types::*;

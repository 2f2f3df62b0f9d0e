//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases: dataset synthesis and persistence, training,
//! prediction and the trained-artifact lifecycle.

mod dataset;
mod model;
mod prediction;
mod synthesis;
mod training;

#[cfg(test)]
mod scenarios;

pub use dataset::{find_patient, load_dataset, save_dataset, DatasetService};
pub use model::{load_artifacts, save_artifacts, ModelSlot, ModelState};
pub use prediction::predict;
pub use synthesis::{
    patient_summary, synthesize_dataset, synthesize_dataset_seeded, synthesize_dataset_with_rng,
};
pub use training::{train, train_with_config, TrainingConfig, TrainingOutcome};

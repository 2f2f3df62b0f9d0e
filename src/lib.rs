//! # Uroflow
//!
//! Uroflowmetry pattern classification.
//!
//! This crate provides:
//! - Simulation of synthetic flow-rate curves for each diagnostic class
//! - Curve shape descriptors and clinical-note text features
//! - A multi-modal random forest trained on scalar, curve and TF-IDF columns
//! - Deterministic re-derivation of the same feature vector at prediction time
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientRecord, FlowCurve, FeatureVector, Diagnosis)
//! - `ml`: Learning primitives (text normalizer, TF-IDF, label codec, forest)
//! - `ports`: Trait definitions for dataset and artifact persistence
//! - `adapters`: Concrete implementations (CSV dataset, bincode artifacts, log sanitizer)
//! - `application`: Use cases (synthesis, training, prediction)
//! - `config`: Environment-driven runtime configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ml;
pub mod ports;

pub use application::{
    find_patient, load_artifacts, load_dataset, predict, save_dataset, synthesize_dataset, train,
    ModelSlot, ModelState,
};
pub use domain::{
    generate_curve, CaseInput, CurveKind, Diagnosis, FeatureVector, FlowCurve, Gender,
    NoteSignal, PatientRecord, PredictionResult,
};
pub use ml::TrainedArtifacts;

/// Result type for Uroflow operations
pub type Result<T> = std::result::Result<T, UroflowError>;

/// Main error type for Uroflow
#[derive(Debug, thiserror::Error)]
pub enum UroflowError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown diagnosis label: {0}")]
    UnknownLabel(String),

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Malformed data: {0}")]
    DataFormat(String),

    #[error("Feature schema mismatch: expected {expected} columns, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<adapters::StorageError> for UroflowError {
    fn from(err: adapters::StorageError) -> Self {
        match err {
            adapters::StorageError::NotFound(what) => Self::NotFound(what),
            adapters::StorageError::Format(what) => Self::DataFormat(what),
            adapters::StorageError::Io(e) => Self::Io(e),
            other => Self::Storage(other.to_string()),
        }
    }
}

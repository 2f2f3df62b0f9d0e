//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! All types are serializable and implement strict validation.

mod curve;
mod diagnosis;
mod features;
mod patient;

pub use curve::{generate_curve, generate_curve_with, CurveKind, FlowCurve, DEFAULT_NUM_POINTS};
pub use diagnosis::{ClassProbability, Diagnosis, NoteSignal, PredictionResult};
pub use features::{
    CurveFeatures, FeatureSchema, FeatureVector, ScalarFeatures, CURVE_COLUMNS, SCALAR_COLUMNS,
};
pub use patient::{round2, CaseInput, Gender, PatientIdentity, PatientRecord};

//! Patient record types for uroflowmetry classification.

use serde::{Deserialize, Serialize};

use super::{Diagnosis, FlowCurve, ScalarFeatures};
use crate::UroflowError;

/// Patient gender as recorded in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = UroflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Male" => Ok(Self::Male),
            "Female" => Ok(Self::Female),
            other => Err(UroflowError::DataFormat(format!("Unknown gender '{other}'"))),
        }
    }
}

/// One analyzed void with its patient context.
///
/// `qmax` and `qave` are derived from the curve (rounded to 2 decimals) and
/// are only set through [`PatientRecord::new`] or when loading a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Stable identifier (`PID0001`, ...)
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub gender: Gender,
    /// Free-text summary line
    pub patient_info: String,
    qmax: f64,
    qave: f64,
    /// Voided volume in ml
    pub volume: f64,
    /// Flow time in seconds
    pub flow_time: f64,
    pub clinical_notes: String,
    flow_curve: FlowCurve,
    pub diagnosis: Diagnosis,
}

/// Identity and context fields of a record, everything except the measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientIdentity {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub gender: Gender,
    pub patient_info: String,
}

impl PatientRecord {
    /// Build a record, deriving Qmax/Qave from the curve.
    #[must_use]
    pub fn new(
        identity: PatientIdentity,
        volume: f64,
        flow_time: f64,
        clinical_notes: String,
        flow_curve: FlowCurve,
        diagnosis: Diagnosis,
    ) -> Self {
        Self {
            id: identity.id,
            first_name: identity.first_name,
            last_name: identity.last_name,
            age: identity.age,
            gender: identity.gender,
            patient_info: identity.patient_info,
            qmax: round2(flow_curve.max()),
            qave: round2(flow_curve.mean()),
            volume,
            flow_time,
            clinical_notes,
            flow_curve,
            diagnosis,
        }
    }

    /// Rebuild a stored record, checking the stored Qmax/Qave against the curve.
    ///
    /// # Errors
    /// Returns `DataFormat` if the stored statistics disagree with the curve
    /// beyond rounding tolerance.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        identity: PatientIdentity,
        qmax: f64,
        qave: f64,
        volume: f64,
        flow_time: f64,
        clinical_notes: String,
        flow_curve: FlowCurve,
        diagnosis: Diagnosis,
    ) -> Result<Self, UroflowError> {
        let record = Self::new(identity, volume, flow_time, clinical_notes, flow_curve, diagnosis);
        if (record.qmax - qmax).abs() > 0.011 || (record.qave - qave).abs() > 0.011 {
            return Err(UroflowError::DataFormat(format!(
                "Record {}: stored Qmax/Qave ({qmax}, {qave}) do not match its flow curve ({}, {})",
                record.id, record.qmax, record.qave
            )));
        }
        Ok(record)
    }

    #[must_use]
    pub fn qmax(&self) -> f64 {
        self.qmax
    }

    #[must_use]
    pub fn qave(&self) -> f64 {
        self.qave
    }

    #[must_use]
    pub fn flow_curve(&self) -> &FlowCurve {
        &self.flow_curve
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    #[must_use]
    pub fn scalars(&self) -> ScalarFeatures {
        ScalarFeatures {
            qmax: self.qmax,
            qave: self.qave,
            volume: self.volume,
            flow_time: self.flow_time,
        }
    }

    /// Prediction input built from this record.
    #[must_use]
    pub fn to_case(&self) -> CaseInput {
        CaseInput {
            qmax: self.qmax,
            qave: self.qave,
            volume: self.volume,
            flow_time: self.flow_time,
            clinical_notes: self.clinical_notes.clone(),
            flow_curve: self.flow_curve.clone(),
        }
    }
}

/// A single case submitted for prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseInput {
    pub qmax: f64,
    pub qave: f64,
    pub volume: f64,
    pub flow_time: f64,
    pub clinical_notes: String,
    pub flow_curve: FlowCurve,
}

impl CaseInput {
    /// Validate caller-supplied measurements.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in [("Qmax", self.qmax), ("Qave", self.qave)] {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} {value} must be finite and >= 0"));
            }
        }
        if !self.volume.is_finite() || self.volume <= 0.0 {
            errors.push(format!("Volume {} must be > 0", self.volume));
        }
        if !self.flow_time.is_finite() || self.flow_time <= 0.0 {
            errors.push(format!("Flow time {} must be > 0", self.flow_time));
        }
        if self.qave > self.qmax {
            errors.push(format!(
                "Qave {} cannot exceed Qmax {}",
                self.qave, self.qmax
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    #[must_use]
    pub fn scalars(&self) -> ScalarFeatures {
        ScalarFeatures {
            qmax: self.qmax,
            qave: self.qave,
            volume: self.volume,
            flow_time: self.flow_time,
        }
    }
}

/// Round to two decimals (display and storage precision of Qmax/Qave).
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

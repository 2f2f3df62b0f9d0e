//! CSV adapter: Implementation of DatasetStore.
//!
//! One row per patient record. The `FlowCurve` column holds the sampled
//! curve as a bracketed, comma-separated list of decimal numbers
//! (`[0, 1.25, 3.5, 0]`). Loading parses that list with a strict grammar and
//! fails closed on anything else.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::StorageError;
use crate::domain::{Diagnosis, FlowCurve, Gender, PatientIdentity, PatientRecord};
use crate::ports::DatasetStore;
use crate::UroflowError;

/// Columns every dataset file must carry.
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "PatientID",
    "FirstName",
    "LastName",
    "Age",
    "Gender",
    "PatientInfo",
    "Qmax",
    "Qave",
    "Volume",
    "FlowTime",
    "ClinicalNotes",
    "FlowCurve",
    "Diagnosis",
];

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DatasetRow {
    #[serde(rename = "PatientID")]
    patient_id: String,
    first_name: String,
    last_name: String,
    age: u32,
    gender: String,
    patient_info: String,
    qmax: f64,
    qave: f64,
    volume: f64,
    flow_time: f64,
    clinical_notes: String,
    flow_curve: String,
    diagnosis: String,
}

fn format_error(err: UroflowError) -> StorageError {
    match err {
        UroflowError::DataFormat(msg)
        | UroflowError::Validation(msg)
        | UroflowError::UnknownLabel(msg) => StorageError::Format(msg),
        other => StorageError::Format(other.to_string()),
    }
}

impl DatasetRow {
    fn from_record(record: &PatientRecord) -> Self {
        Self {
            patient_id: record.id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            age: record.age,
            gender: record.gender.to_string(),
            patient_info: record.patient_info.clone(),
            qmax: record.qmax(),
            qave: record.qave(),
            volume: record.volume,
            flow_time: record.flow_time,
            clinical_notes: record.clinical_notes.clone(),
            flow_curve: format_curve(record.flow_curve().as_slice()),
            diagnosis: record.diagnosis.to_string(),
        }
    }

    fn into_record(self) -> Result<PatientRecord, StorageError> {
        let gender: Gender = self.gender.parse().map_err(format_error)?;
        let diagnosis: Diagnosis = self.diagnosis.parse().map_err(format_error)?;
        let samples = parse_curve(&self.flow_curve)?;
        let curve = FlowCurve::new(samples).map_err(format_error)?;

        let identity = PatientIdentity {
            id: self.patient_id,
            first_name: self.first_name,
            last_name: self.last_name,
            age: self.age,
            gender,
            patient_info: self.patient_info,
        };
        PatientRecord::from_stored(
            identity,
            self.qmax,
            self.qave,
            self.volume,
            self.flow_time,
            self.clinical_notes,
            curve,
            diagnosis,
        )
        .map_err(format_error)
    }
}

/// Render samples as `[a, b, c]` using shortest round-trip decimals.
#[must_use]
pub fn format_curve(samples: &[f64]) -> String {
    let body = samples
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{body}]")
}

/// Whether `token` is a plain decimal literal: optional sign, digits with an
/// optional fraction, optional exponent. Rejects `nan`, `inf` and friends.
fn is_decimal_literal(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

/// Parse a stored curve field.
///
/// Accepts `[]` or `[n, n, ...]` with optional surrounding whitespace, where
/// every `n` is a finite decimal literal.
///
/// # Errors
/// Returns `StorageError::Format` for anything else.
pub fn parse_curve(field: &str) -> Result<Vec<f64>, StorageError> {
    let trimmed = field.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| {
            StorageError::Format(format!("flow curve must be a bracketed list, got {trimmed:?}"))
        })?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .enumerate()
        .map(|(i, token)| {
            let token = token.trim();
            if !is_decimal_literal(token) {
                return Err(StorageError::Format(format!(
                    "flow curve element {i} is not a number: {token:?}"
                )));
            }
            token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    StorageError::Format(format!("flow curve element {i} is out of range: {token}"))
                })
        })
        .collect()
}

/// CSV dataset storage adapter.
#[derive(Debug, Clone)]
pub struct CsvDatasetStore {
    path: PathBuf,
}

impl CsvDatasetStore {
    /// Create a store backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_headers(headers: &csv::StringRecord) -> Result<(), StorageError> {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Format(format!(
                "dataset is missing required columns: {}",
                missing.join(", ")
            )))
        }
    }
}

impl DatasetStore for CsvDatasetStore {
    type Error = StorageError;

    fn save(&self, records: &[PatientRecord]) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for record in records {
                writer.serialize(DatasetRow::from_record(record))?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!("Wrote {} dataset rows", records.len());
        Ok(())
    }

    fn load(&self) -> Result<Vec<PatientRecord>, Self::Error> {
        if !self.path.exists() {
            return Err(StorageError::NotFound(format!(
                "dataset file {}",
                self.path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)?;
        Self::check_headers(reader.headers()?)?;

        let records = reader
            .deserialize::<DatasetRow>()
            .enumerate()
            .map(|(i, row)| {
                let row = row.map_err(|e| StorageError::Format(format!("row {}: {e}", i + 1)))?;
                row.into_record()
                    .map_err(|e| StorageError::Format(format!("row {}: {e}", i + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} dataset rows", records.len());
        Ok(records)
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}

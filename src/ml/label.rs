//! Label codec: bijection between diagnosis names and class indices.

use serde::{Deserialize, Serialize};

use crate::domain::Diagnosis;
use crate::UroflowError;

/// Sorted list of the class names seen at fit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodec {
    classes: Vec<String>,
}

impl LabelCodec {
    /// Fit on observed labels; classes are deduplicated and sorted.
    #[must_use]
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Fit on diagnoses.
    #[must_use]
    pub fn fit_diagnoses(labels: &[Diagnosis]) -> Self {
        let names: Vec<&str> = labels.iter().map(Diagnosis::as_str).collect();
        Self::fit(&names)
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class index of a label.
    ///
    /// # Errors
    /// Returns `UnknownLabel` if the label was not seen at fit time.
    pub fn encode(&self, label: &str) -> Result<usize, UroflowError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| UroflowError::UnknownLabel(label.to_string()))
    }

    /// Class index of a diagnosis.
    ///
    /// # Errors
    /// Returns `UnknownLabel` if the diagnosis was not seen at fit time.
    pub fn encode_diagnosis(&self, diagnosis: Diagnosis) -> Result<usize, UroflowError> {
        self.encode(diagnosis.as_str())
    }

    /// Label of a class index.
    ///
    /// # Errors
    /// Returns `UnknownLabel` if the index is out of range.
    pub fn decode(&self, index: usize) -> Result<&str, UroflowError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| UroflowError::UnknownLabel(format!("class index {index}")))
    }

    /// Diagnosis of a class index.
    ///
    /// # Errors
    /// Returns `UnknownLabel` if the index is out of range or names no diagnosis.
    pub fn decode_diagnosis(&self, index: usize) -> Result<Diagnosis, UroflowError> {
        self.decode(index)?.parse()
    }
}

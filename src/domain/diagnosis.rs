//! Diagnosis and prediction result types.
//!
//! Represents the closed label set and the output of the classifier.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::UroflowError;

/// Uroflowmetry pattern category.
///
/// The set is closed: adding a category requires retraining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Diagnosis {
    /// Bell-shaped curve, unobstructed voiding
    Normal,
    /// Flattened, prolonged curve
    Obstructive,
    /// Fragmented, interrupted curve
    Dysfunctional,
}

impl Diagnosis {
    /// All categories, in generation order.
    pub const ALL: [Diagnosis; 3] = [Self::Normal, Self::Obstructive, Self::Dysfunctional];

    /// Canonical label string (as stored in datasets and the label codec).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Obstructive => "Obstructive",
            Self::Dysfunctional => "Dysfunctional",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Normal => "Normal voiding pattern",
            Self::Obstructive => "Obstructive pattern - flattened, prolonged flow",
            Self::Dysfunctional => "Dysfunctional pattern - interrupted, irregular flow",
        }
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Diagnosis {
    type Err = UroflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Normal" => Ok(Self::Normal),
            "Obstructive" => Ok(Self::Obstructive),
            "Dysfunctional" => Ok(Self::Dysfunctional),
            other => Err(UroflowError::UnknownLabel(other.to_string())),
        }
    }
}

/// Rule-based reading of the normalized clinical note.
///
/// Independent of the classifier; see [`NoteSignal::from_normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteSignal {
    /// Note was empty after normalization
    Empty,
    /// Note mentions straining, weak or interrupted stream
    Obstructive,
    /// Note mentions urgency or incontinence
    Dysfunctional,
    /// Note mentions a normal or unremarkable stream
    Normal,
    /// Note present, no keyword matched
    NoSignal,
}

const OBSTRUCTIVE_KEYWORDS: [&str; 5] = ["strain", "weak", "intermittent", "hesitan", "incomplete"];
const DYSFUNCTIONAL_KEYWORDS: [&str; 4] = ["urge", "incontinen", "sudden", "involuntary"];
const NORMAL_KEYWORDS: [&str; 4] = ["normal", "complaint", "good", "unremarkable"];

impl NoteSignal {
    /// Classify a normalized note by keyword containment.
    ///
    /// Checked in order: empty, obstructive, dysfunctional, normal.
    #[must_use]
    pub fn from_normalized(normalized: &str) -> Self {
        let text = normalized.trim();
        if text.is_empty() {
            Self::Empty
        } else if OBSTRUCTIVE_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Obstructive
        } else if DYSFUNCTIONAL_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Dysfunctional
        } else if NORMAL_KEYWORDS.iter().any(|k| text.contains(k)) {
            Self::Normal
        } else {
            Self::NoSignal
        }
    }

    /// Annotation shown next to the model prediction.
    #[must_use]
    pub fn annotation(&self) -> &'static str {
        match self {
            Self::Empty => "no clinical note provided",
            Self::Obstructive => "contains obstructive indicators",
            Self::Dysfunctional => "contains dysfunctional indicators",
            Self::Normal => "contains normal indicators",
            Self::NoSignal => "note analyzed, no strong signal",
        }
    }
}

impl std::fmt::Display for NoteSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.annotation())
    }
}

/// Probability assigned to a single class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub diagnosis: Diagnosis,
    pub probability: f64,
}

/// Output of a single prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Decoded model prediction
    pub diagnosis: Diagnosis,

    /// Per-class probabilities, in label codec order (sums to 1)
    pub probabilities: Vec<ClassProbability>,

    /// Keyword reading of the clinical note
    pub note_signal: NoteSignal,

    /// Timestamp of the prediction
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PredictionResult {
    /// Create a new result stamped with the current time.
    #[must_use]
    pub fn new(
        diagnosis: Diagnosis,
        probabilities: Vec<ClassProbability>,
        note_signal: NoteSignal,
    ) -> Self {
        Self {
            diagnosis,
            probabilities,
            note_signal,
            created_at: chrono::Utc::now(),
        }
    }

    /// Probability of a given class (0 if the class was not fitted).
    #[must_use]
    pub fn probability_of(&self, diagnosis: Diagnosis) -> f64 {
        self.probabilities
            .iter()
            .find(|p| p.diagnosis == diagnosis)
            .map_or(0.0, |p| p.probability)
    }

    /// Confidence of the predicted class.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.probability_of(self.diagnosis)
    }

    /// Probabilities at display precision (two decimals).
    #[must_use]
    pub fn formatted_probabilities(&self) -> Vec<(Diagnosis, String)> {
        self.probabilities
            .iter()
            .map(|p| (p.diagnosis, format!("{:.2}", p.probability)))
            .collect()
    }
}

//! Feature extraction and the ordered feature schema.
//!
//! The classifier input is always laid out as:
//! `[Qmax, Qave, Volume, FlowTime]` ++ curve descriptors ++ `tfidf_0..tfidf_{V-1}`.
//! Both training and prediction build vectors through [`FeatureVector::assemble`],
//! so the layout is fixed by construction.

use serde::{Deserialize, Serialize};

use crate::UroflowError;

/// Scalar measurement columns, in order.
pub const SCALAR_COLUMNS: [&str; 4] = ["Qmax", "Qave", "Volume", "FlowTime"];

/// Curve descriptor columns, in order.
pub const CURVE_COLUMNS: [&str; 5] = [
    "PeakFlow_Curve",
    "MeanFlow_Curve",
    "StdDevFlow_Curve",
    "SkewnessFlow_Curve",
    "HasMultiplePeaks_Curve",
];

/// Scalar uroflowmetry measurements of one void.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScalarFeatures {
    pub qmax: f64,
    pub qave: f64,
    pub volume: f64,
    pub flow_time: f64,
}

impl ScalarFeatures {
    #[must_use]
    pub fn to_array(&self) -> [f64; 4] {
        [self.qmax, self.qave, self.volume, self.flow_time]
    }
}

/// Shape descriptors of a flow curve.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveFeatures {
    pub peak: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub has_multiple_peaks: bool,
}

impl CurveFeatures {
    /// Extract descriptors from raw samples.
    ///
    /// An empty sequence yields all zeros.
    #[must_use]
    pub fn extract(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let n = samples.len() as f64;
        let peak = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / n;

        let m2 = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let m3 = samples.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n;
        let std_dev = m2.sqrt();

        let skewness = if samples.len() >= 2 && m2 > f64::EPSILON {
            m3 / m2.powf(1.5)
        } else {
            0.0
        };

        Self {
            peak,
            mean,
            std_dev,
            skewness,
            has_multiple_peaks: count_local_maxima(samples) > 1,
        }
    }

    #[must_use]
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.peak,
            self.mean,
            self.std_dev,
            self.skewness,
            if self.has_multiple_peaks { 1.0 } else { 0.0 },
        ]
    }
}

/// Count rising-to-falling transitions of the first difference.
///
/// Flat steps do not reset the direction, so a plateau counts once.
fn count_local_maxima(samples: &[f64]) -> usize {
    let mut rising = false;
    let mut maxima = 0;
    for w in samples.windows(2) {
        let d = w[1] - w[0];
        if d > 0.0 {
            rising = true;
        } else if d < 0.0 {
            if rising {
                maxima += 1;
            }
            rising = false;
        }
    }
    maxima
}

/// Ordered column layout the classifier was fitted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    text_columns: usize,
}

impl FeatureSchema {
    /// Schema for a vectorizer with `vocabulary_size` terms.
    #[must_use]
    pub fn new(vocabulary_size: usize) -> Self {
        Self {
            text_columns: vocabulary_size,
        }
    }

    #[must_use]
    pub fn text_columns(&self) -> usize {
        self.text_columns
    }

    /// Total number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        SCALAR_COLUMNS.len() + CURVE_COLUMNS.len() + self.text_columns
    }

    /// Column names in layout order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        SCALAR_COLUMNS
            .iter()
            .chain(CURVE_COLUMNS.iter())
            .map(|s| (*s).to_string())
            .chain((0..self.text_columns).map(|i| format!("tfidf_{i}")))
            .collect()
    }
}

/// One classifier input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    scalars: ScalarFeatures,
    curve: CurveFeatures,
    text: Vec<f64>,
}

impl FeatureVector {
    /// Assemble a row for `schema`.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the text block width differs from the schema.
    pub fn assemble(
        schema: &FeatureSchema,
        scalars: ScalarFeatures,
        curve: CurveFeatures,
        text: Vec<f64>,
    ) -> Result<Self, UroflowError> {
        if text.len() != schema.text_columns {
            return Err(UroflowError::SchemaMismatch {
                expected: schema.width(),
                actual: SCALAR_COLUMNS.len() + CURVE_COLUMNS.len() + text.len(),
            });
        }
        Ok(Self {
            scalars,
            curve,
            text,
        })
    }

    #[must_use]
    pub fn scalars(&self) -> &ScalarFeatures {
        &self.scalars
    }

    #[must_use]
    pub fn curve(&self) -> &CurveFeatures {
        &self.curve
    }

    #[must_use]
    pub fn text(&self) -> &[f64] {
        &self.text
    }

    #[must_use]
    pub fn width(&self) -> usize {
        SCALAR_COLUMNS.len() + CURVE_COLUMNS.len() + self.text.len()
    }

    /// Flatten into schema order.
    #[must_use]
    pub fn to_dense(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        out.extend_from_slice(&self.scalars.to_array());
        out.extend_from_slice(&self.curve.to_array());
        out.extend_from_slice(&self.text);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_curve_features() {
        assert_eq!(CurveFeatures::extract(&[]).to_array(), [0.0; 5]);
    }

    #[test]
    fn test_basic_statistics() {
        let f = CurveFeatures::extract(&[0.0, 2.0, 4.0, 2.0, 0.0]);
        assert_eq!(f.peak, 4.0);
        assert!((f.mean - 1.6).abs() < 1e-12);
        // population variance: (2.56 + 0.16 + 5.76 + 0.16 + 2.56) / 5 = 2.24
        assert!((f.std_dev - 2.24_f64.sqrt()).abs() < 1e-12);
        assert!(!f.has_multiple_peaks);
    }

    #[test]
    fn test_skewness_sign() {
        let right_tail = CurveFeatures::extract(&[1.0, 1.0, 1.0, 1.0, 10.0]);
        let left_tail = CurveFeatures::extract(&[10.0, 10.0, 10.0, 10.0, 1.0]);
        assert!(right_tail.skewness > 0.0);
        assert!(left_tail.skewness < 0.0);
        assert_eq!(CurveFeatures::extract(&[3.0]).skewness, 0.0);
        assert_eq!(CurveFeatures::extract(&[2.0, 2.0, 2.0]).skewness, 0.0);
    }

    #[test]
    fn test_symmetric_skewness_is_zero() {
        let f = CurveFeatures::extract(&[1.0, 2.0, 3.0]);
        assert!(f.skewness.abs() < 1e-12);
    }

    #[test]
    fn test_multiple_peaks_flag() {
        assert!(!CurveFeatures::extract(&[0.0, 1.0, 2.0, 1.0, 0.0]).has_multiple_peaks);
        assert!(CurveFeatures::extract(&[0.0, 2.0, 0.0, 3.0, 0.0]).has_multiple_peaks);
        // A plateau is a single maximum.
        assert!(!CurveFeatures::extract(&[0.0, 2.0, 2.0, 2.0, 0.0]).has_multiple_peaks);
        assert_eq!(CurveFeatures::extract(&[0.0, 2.0, 0.0, 3.0, 0.0]).to_array()[4], 1.0);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let samples = [0.0, 3.2, 7.9, 12.4, 9.1, 4.4, 0.0];
        assert_eq!(CurveFeatures::extract(&samples), CurveFeatures::extract(&samples));
    }

    #[test]
    fn test_schema_column_order() {
        let schema = FeatureSchema::new(3);
        let names = schema.column_names();
        assert_eq!(schema.width(), 12);
        assert_eq!(names.len(), 12);
        assert_eq!(names[0], "Qmax");
        assert_eq!(names[3], "FlowTime");
        assert_eq!(names[4], "PeakFlow_Curve");
        assert_eq!(names[8], "HasMultiplePeaks_Curve");
        assert_eq!(names[9], "tfidf_0");
        assert_eq!(names[11], "tfidf_2");
    }

    #[test]
    fn test_assemble_enforces_schema() {
        let schema = FeatureSchema::new(2);
        let scalars = ScalarFeatures {
            qmax: 20.0,
            qave: 10.0,
            volume: 300.0,
            flow_time: 30.0,
        };
        let curve = CurveFeatures::extract(&[0.0, 1.0, 0.0]);

        let v = FeatureVector::assemble(&schema, scalars, curve, vec![0.5, 0.0])
            .expect("Should assemble");
        let dense = v.to_dense();
        assert_eq!(dense.len(), schema.width());
        assert_eq!(&dense[..4], &[20.0, 10.0, 300.0, 30.0]);
        assert_eq!(dense[9], 0.5);

        let err = FeatureVector::assemble(&schema, scalars, curve, vec![0.5]).unwrap_err();
        assert!(matches!(
            err,
            UroflowError::SchemaMismatch { expected: 11, actual: 10 }
        ));
    }
}

//! The jointly owned artifact set and the shared feature builder.

use serde::{Deserialize, Serialize};

use super::{LabelCodec, RandomForest, TextNormalizer, TfIdfVectorizer};
use crate::domain::{CurveFeatures, FeatureSchema, FeatureVector, ScalarFeatures};
use crate::UroflowError;

/// Classifier, vectorizer and label codec fitted together.
///
/// The classifier's column layout is only meaningful with this exact
/// vectorizer vocabulary and label ordering, so the set is always built,
/// persisted and loaded as one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifacts {
    pub classifier: RandomForest,
    pub vectorizer: TfIdfVectorizer,
    pub codec: LabelCodec,
}

impl TrainedArtifacts {
    /// Bundle fitted parts, checking that their shapes agree.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the classifier width does not match the
    /// vectorizer vocabulary, or `Validation` if the class counts differ.
    pub fn new(
        classifier: RandomForest,
        vectorizer: TfIdfVectorizer,
        codec: LabelCodec,
    ) -> Result<Self, UroflowError> {
        let artifacts = Self {
            classifier,
            vectorizer,
            codec,
        };
        artifacts.check_consistency()?;
        Ok(artifacts)
    }

    /// Column layout implied by the vectorizer.
    #[must_use]
    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.vectorizer.vocabulary_size())
    }

    /// Verify the three parts were fitted together.
    ///
    /// # Errors
    /// See [`TrainedArtifacts::new`].
    pub fn check_consistency(&self) -> Result<(), UroflowError> {
        let expected = self.schema().width();
        if self.classifier.n_features() != expected {
            return Err(UroflowError::SchemaMismatch {
                expected,
                actual: self.classifier.n_features(),
            });
        }
        if self.classifier.n_classes() != self.codec.num_classes() {
            return Err(UroflowError::Validation(format!(
                "classifier has {} classes but label codec has {}",
                self.classifier.n_classes(),
                self.codec.num_classes()
            )));
        }
        Ok(())
    }

    /// Build the feature row for one case from raw inputs.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the text block does not fit the schema.
    pub fn features(
        &self,
        scalars: ScalarFeatures,
        curve: &[f64],
        notes: &str,
    ) -> Result<FeatureVector, UroflowError> {
        build_features(
            &self.schema(),
            &self.vectorizer,
            &TextNormalizer::new(),
            scalars,
            curve,
            notes,
        )
    }
}

/// Assemble one classifier row: scalars ++ curve descriptors ++ TF-IDF.
///
/// Training and prediction both go through this function.
///
/// # Errors
/// Returns `SchemaMismatch` if the vectorizer does not match `schema`.
pub fn build_features(
    schema: &FeatureSchema,
    vectorizer: &TfIdfVectorizer,
    normalizer: &TextNormalizer,
    scalars: ScalarFeatures,
    curve: &[f64],
    notes: &str,
) -> Result<FeatureVector, UroflowError> {
    let text = vectorizer.transform_raw(normalizer, notes);
    FeatureVector::assemble(schema, scalars, CurveFeatures::extract(curve), text)
}

//! Classifier training: features, label encoding, hold-out evaluation.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::{FeatureSchema, PatientRecord};
use crate::ml::{
    build_features, stratified_split, LabelCodec, RandomForest, TextNormalizer, TfIdfVectorizer,
    TrainedArtifacts, TrainingReport, DEFAULT_MAX_FEATURES, DEFAULT_N_TREES, DEFAULT_SEED,
    DEFAULT_TEST_FRACTION,
};
use crate::UroflowError;

/// Training hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    pub n_trees: usize,
    /// Seed for both the hold-out split and the forest
    pub seed: u64,
    pub test_fraction: f64,
    /// Vocabulary cap of the text vectorizer
    pub max_features: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_N_TREES,
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

impl TrainingConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Artifacts plus the diagnostic hold-out report.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifacts: TrainedArtifacts,
    pub report: TrainingReport,
}

/// Train with the default configuration (100 trees, seed 42, 70/30 split).
///
/// # Errors
/// See [`train_with_config`].
pub fn train(records: &[PatientRecord]) -> Result<TrainedArtifacts, UroflowError> {
    Ok(train_with_config(records, &TrainingConfig::default())?.artifacts)
}

/// Fit vectorizer, label codec and forest on `records`.
///
/// The vectorizer and codec are fitted on every record; the forest is fitted
/// on the stratified training part and scored on the held-out part. The same
/// records and configuration always produce the same artifacts.
///
/// # Errors
/// Returns `Validation` for an empty dataset.
pub fn train_with_config(
    records: &[PatientRecord],
    config: &TrainingConfig,
) -> Result<TrainingOutcome, UroflowError> {
    if records.is_empty() {
        return Err(UroflowError::Validation(
            "cannot train on an empty dataset".to_string(),
        ));
    }

    let normalizer = TextNormalizer::new();
    let normalized: Vec<String> = records
        .iter()
        .map(|r| normalizer.normalize(&r.clinical_notes))
        .collect();
    let vectorizer = TfIdfVectorizer::fit(&normalized, config.max_features);
    let schema = FeatureSchema::new(vectorizer.vocabulary_size());

    let diagnoses: Vec<_> = records.iter().map(|r| r.diagnosis).collect();
    let codec = LabelCodec::fit_diagnoses(&diagnoses);
    let y = diagnoses
        .iter()
        .map(|d| codec.encode_diagnosis(*d))
        .collect::<Result<Vec<_>, _>>()?;

    let x = records
        .iter()
        .map(|r| {
            build_features(
                &schema,
                &vectorizer,
                &normalizer,
                r.scalars(),
                r.flow_curve().as_slice(),
                &r.clinical_notes,
            )
            .map(|row| row.to_dense())
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        "Built feature table: {} rows x {} columns",
        x.len(),
        schema.width()
    );

    let mut split_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let split = stratified_split(&y, codec.num_classes(), config.test_fraction, &mut split_rng);

    let x_train: Vec<Vec<f64>> = split.train.iter().map(|&i| x[i].clone()).collect();
    let y_train: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();

    let mut classifier = RandomForest::new(config.n_trees).with_seed(config.seed);
    classifier.fit(&x_train, &y_train, codec.num_classes())?;

    let truth: Vec<usize> = split.test.iter().map(|&i| y[i]).collect();
    let predicted = split
        .test
        .iter()
        .map(|&i| classifier.predict(&x[i]))
        .collect::<Result<Vec<_>, _>>()?;
    let report = TrainingReport::evaluate(&truth, &predicted, codec.classes(), split.train.len());

    tracing::info!(
        "Model trained: accuracy={:.4} ({} train / {} test samples, {} features)",
        report.accuracy,
        report.n_train,
        report.n_test,
        schema.width()
    );

    let artifacts = TrainedArtifacts::new(classifier, vectorizer, codec)?;
    Ok(TrainingOutcome { artifacts, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::synthesis::synthesize_dataset_seeded;

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            n_trees: 15,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_empty_dataset_rejected() {
        assert!(matches!(train(&[]), Err(UroflowError::Validation(_))));
    }

    #[test]
    fn test_training_outcome_shapes() {
        let records = synthesize_dataset_seeded(120, 11).expect("synthesize");
        let outcome = train_with_config(&records, &small_config()).expect("Should train");

        let artifacts = &outcome.artifacts;
        assert_eq!(artifacts.codec.classes(), &["Dysfunctional", "Normal", "Obstructive"]);
        assert_eq!(
            artifacts.classifier.n_features(),
            9 + artifacts.vectorizer.vocabulary_size()
        );
        assert_eq!(outcome.report.n_train + outcome.report.n_test, 120);
        assert!(outcome.report.accuracy > 0.6, "accuracy {}", outcome.report.accuracy);
    }

    #[test]
    fn test_training_is_reproducible() {
        let records = synthesize_dataset_seeded(60, 5).expect("synthesize");
        let a = train_with_config(&records, &small_config()).expect("train");
        let b = train_with_config(&records, &small_config()).expect("train");
        assert_eq!(a.artifacts, b.artifacts);
        assert_eq!(a.report, b.report);
    }
}

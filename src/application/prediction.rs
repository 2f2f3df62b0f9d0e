//! Prediction: rebuild the training-time feature row for one case.

use crate::domain::{CaseInput, ClassProbability, NoteSignal, PredictionResult};
use crate::ml::{argmax, TextNormalizer, TrainedArtifacts};
use crate::UroflowError;

/// Classify one case.
///
/// Returns the decoded diagnosis, one probability per fitted class (codec
/// order, summing to 1) and the keyword reading of the note.
///
/// # Errors
/// Returns `Validation` for invalid measurements, `SchemaMismatch` if the
/// artifacts disagree on the column layout and `UnknownLabel` if the codec
/// holds a class that is not a known diagnosis.
pub fn predict(
    artifacts: &TrainedArtifacts,
    case: &CaseInput,
) -> Result<PredictionResult, UroflowError> {
    case.validate()
        .map_err(|errors| UroflowError::Validation(errors.join("; ")))?;

    let features = artifacts.features(
        case.scalars(),
        case.flow_curve.as_slice(),
        &case.clinical_notes,
    )?;
    let proba = artifacts.classifier.predict_proba(&features.to_dense())?;

    let probabilities = proba
        .iter()
        .enumerate()
        .map(|(i, &probability)| {
            Ok(ClassProbability {
                diagnosis: artifacts.codec.decode_diagnosis(i)?,
                probability,
            })
        })
        .collect::<Result<Vec<_>, UroflowError>>()?;
    let diagnosis = artifacts.codec.decode_diagnosis(argmax(&proba))?;

    let note_signal =
        NoteSignal::from_normalized(&TextNormalizer::new().normalize(&case.clinical_notes));

    tracing::debug!(
        "Predicted {} with confidence {:.2}",
        diagnosis,
        proba.get(argmax(&proba)).copied().unwrap_or(0.0)
    );

    Ok(PredictionResult::new(diagnosis, probabilities, note_signal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Diagnosis, FlowCurve};
    use crate::ml::{LabelCodec, RandomForest, TfIdfVectorizer};

    fn toy_artifacts() -> TrainedArtifacts {
        let vectorizer = TfIdfVectorizer::fit(&["straining weak", "sudden urge"], 500);
        let codec = LabelCodec::fit_diagnoses(&[Diagnosis::Normal, Diagnosis::Obstructive]);
        let width = 9 + vectorizer.vocabulary_size();
        let mut low = vec![0.0; width];
        let mut high = vec![0.0; width];
        low[0] = 5.0;
        high[0] = 25.0;
        // Obstructive = low Qmax, Normal = high Qmax.
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| if i % 2 == 0 { low.clone() } else { high.clone() })
            .collect();
        let y: Vec<usize> = (0..20).map(|i| if i % 2 == 0 { 1 } else { 0 }).collect();
        let mut forest = RandomForest::new(25);
        forest.fit(&x, &y, 2).expect("fit");
        TrainedArtifacts::new(forest, vectorizer, codec).expect("consistent")
    }

    fn case(qmax: f64, notes: &str) -> CaseInput {
        CaseInput {
            qmax,
            qave: qmax / 2.0,
            volume: 300.0,
            flow_time: 40.0,
            clinical_notes: notes.to_string(),
            flow_curve: FlowCurve::new(vec![0.0, qmax, 0.0]).expect("curve"),
        }
    }

    #[test]
    fn test_prediction_result() {
        let artifacts = toy_artifacts();
        let result = predict(&artifacts, &case(4.0, "Straining to void.")).expect("Should predict");

        assert_eq!(result.diagnosis, Diagnosis::Obstructive);
        assert_eq!(result.probabilities.len(), 2);
        let total: f64 = result.probabilities.iter().map(|p| p.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(result.note_signal, NoteSignal::Obstructive);
        assert_eq!(result.probability_of(Diagnosis::Dysfunctional), 0.0);
    }

    #[test]
    fn test_note_signal_for_empty_note() {
        let result = predict(&toy_artifacts(), &case(30.0, "   ")).expect("Should predict");
        assert_eq!(result.diagnosis, Diagnosis::Normal);
        assert_eq!(result.note_signal, NoteSignal::Empty);
    }

    #[test]
    fn test_invalid_case_rejected() {
        let mut bad = case(10.0, "");
        bad.volume = -1.0;
        assert!(matches!(
            predict(&toy_artifacts(), &bad),
            Err(UroflowError::Validation(_))
        ));
    }
}

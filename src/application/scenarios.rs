//! End-to-end scenarios across synthesis, persistence, training and prediction.

use tempfile::tempdir;

use super::*;
use crate::adapters::FsArtifactStore;
use crate::domain::{generate_curve, round2, CaseInput, CurveKind, Diagnosis, NoteSignal};
use crate::UroflowError;

#[test]
fn scenario_obstructive_case_is_recognized() {
    let records = synthesize_dataset_seeded(500, 42).expect("Should synthesize");
    let artifacts = train(&records).expect("Should train");

    let curve = generate_curve(CurveKind::Obstructive, 300.0, 60.0).expect("Should generate");
    let case = CaseInput {
        qmax: round2(curve.max()),
        qave: round2(curve.mean()),
        volume: 300.0,
        flow_time: 60.0,
        clinical_notes: "Patient reports straining to void.".to_string(),
        flow_curve: curve,
    };

    let result = predict(&artifacts, &case).expect("Should predict");
    assert_eq!(result.diagnosis, Diagnosis::Obstructive);
    let obstructive = result.probability_of(Diagnosis::Obstructive);
    for d in [Diagnosis::Normal, Diagnosis::Dysfunctional] {
        assert!(obstructive >= result.probability_of(d));
    }
    let total: f64 = result.probabilities.iter().map(|p| p.probability).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(result.note_signal, NoteSignal::Obstructive);
    assert_eq!(
        result.note_signal.annotation(),
        "contains obstructive indicators"
    );
}

#[test]
fn scenario_prediction_before_training_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let slot = ModelSlot::new(FsArtifactStore::new(dir.path()));
    let curve = generate_curve(CurveKind::Normal, 300.0, 25.0).expect("Should generate");
    let case = CaseInput {
        qmax: round2(curve.max()),
        qave: round2(curve.mean()),
        volume: 300.0,
        flow_time: 25.0,
        clinical_notes: String::new(),
        flow_curve: curve,
    };

    let err = slot.predict(&case).unwrap_err();
    assert!(matches!(err, UroflowError::ModelNotLoaded(_)));
}

#[test]
fn scenario_dataset_round_trip() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("simulated_uroflow_data.csv");
    let records = synthesize_dataset_seeded(40, 42).expect("Should synthesize");

    save_dataset(&records, &path).expect("Should save");
    let loaded = load_dataset(&path).expect("Should load");

    assert_eq!(loaded.len(), records.len());
    for (a, b) in records.iter().zip(&loaded) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.first_name, b.first_name);
        assert_eq!(a.last_name, b.last_name);
        assert_eq!(a.age, b.age);
        assert_eq!(a.gender, b.gender);
        assert_eq!(a.patient_info, b.patient_info);
        assert_eq!(a.qmax(), b.qmax());
        assert_eq!(a.qave(), b.qave());
        assert_eq!(a.volume, b.volume);
        assert_eq!(a.flow_time, b.flow_time);
        assert_eq!(a.clinical_notes, b.clinical_notes);
        assert_eq!(a.diagnosis, b.diagnosis);
        assert_eq!(a.flow_curve().len(), b.flow_curve().len());
        for (x, y) in a.flow_curve().as_slice().iter().zip(b.flow_curve().as_slice()) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    assert_eq!(find_patient(&loaded, "PID0040").expect("found").id, "PID0040");
}

#[test]
fn scenario_zero_volume_curve() {
    let curve = generate_curve(CurveKind::Normal, 0.0, 30.0).expect("Should not fail");
    assert_eq!(curve.len(), 100);
    assert_eq!(curve.as_slice()[0], 0.0);
    assert_eq!(curve.as_slice()[99], 0.0);
    assert!(curve.as_slice().iter().all(|v| v.is_finite() && *v >= 0.0 && *v < 3.0));
}

#[test]
fn scenario_artifacts_survive_restart() {
    let dir = tempdir().expect("tempdir");
    let records = synthesize_dataset_seeded(90, 42).expect("Should synthesize");
    let config = TrainingConfig {
        n_trees: 20,
        ..TrainingConfig::default()
    };

    let mut slot = ModelSlot::new(FsArtifactStore::new(dir.path()));
    slot.train(&records, &config).expect("Should train");
    slot.persist().expect("Should persist");

    let loaded = load_artifacts(dir.path()).expect("Should load");
    let trained = slot.artifacts().expect("trained");
    assert_eq!(loaded.vectorizer.vocabulary(), trained.vectorizer.vocabulary());
    assert_eq!(loaded.codec.classes(), trained.codec.classes());

    for record in records.iter().take(10) {
        let case = record.to_case();
        assert_eq!(
            predict(&loaded, &case).expect("predict").probabilities,
            predict(trained, &case).expect("predict").probabilities
        );
    }
}

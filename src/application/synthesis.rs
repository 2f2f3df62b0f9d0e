//! Dataset synthesis: labeled synthetic patients for training.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::domain::{
    generate_curve_with, CurveKind, Diagnosis, Gender, PatientIdentity, PatientRecord,
    DEFAULT_NUM_POINTS,
};
use crate::UroflowError;

const MALE_FIRST_NAMES: [&str; 7] = ["James", "Robert", "Michael", "David", "Thomas", "Daniel", "Alex"];
const FEMALE_FIRST_NAMES: [&str; 7] = ["Mary", "Linda", "Sarah", "Emily", "Laura", "Alex", "Grace"];
const LAST_NAMES: [&str; 7] = ["Smith", "Johnson", "Brown", "Taylor", "Miller", "Wilson", "Clark"];

const NORMAL_NOTES: [&str; 4] = [
    "No complaints. Normal voiding pattern.",
    "Routine follow-up. Good stream.",
    "Complete bladder emptying.",
    "No significant issues noted.",
];

const OBSTRUCTIVE_NOTES: [&str; 4] = [
    "Straining to void. Weak stream.",
    "Frequent nocturia. Straining in the mornings.",
    "Sensation of incomplete emptying. Intermittent stream.",
    "Suspected prostate enlargement. Voiding with abdominal straining.",
];

const DYSFUNCTIONAL_NOTES: [&str; 4] = [
    "Involuntary detrusor contractions. Sudden urge to void.",
    "Episodes of urge incontinence. Urgency sensation.",
    "Pain or burning during voiding. Inadequate emptying.",
    "Neurological condition present. Weak bladder muscles.",
];

/// Class-conditioned measurement ranges (inclusive, whole units).
struct ClassProfile {
    volume: (u32, u32),
    flow_time: (u32, u32),
    notes: &'static [&'static str],
}

fn profile(diagnosis: Diagnosis) -> ClassProfile {
    match diagnosis {
        Diagnosis::Normal => ClassProfile {
            volume: (200, 500),
            flow_time: (15, 35),
            notes: &NORMAL_NOTES,
        },
        Diagnosis::Obstructive => ClassProfile {
            volume: (150, 450),
            flow_time: (30, 80),
            notes: &OBSTRUCTIVE_NOTES,
        },
        Diagnosis::Dysfunctional => ClassProfile {
            volume: (100, 400),
            flow_time: (20, 70),
            notes: &DYSFUNCTIONAL_NOTES,
        },
    }
}

/// Summary line shown next to a record, with a comorbidity hint when the
/// demographic and diagnosis combination suggests one.
#[must_use]
pub fn patient_summary(
    first_name: &str,
    last_name: &str,
    age: u32,
    gender: Gender,
    diagnosis: Diagnosis,
) -> String {
    let mut info = format!("Patient: {first_name} {last_name} | Age: {age} | Gender: {gender}");
    match (gender, diagnosis) {
        (Gender::Male, Diagnosis::Obstructive) if age > 50 => {
            info.push_str(" | Suspected BPH history.");
        }
        (Gender::Female, Diagnosis::Dysfunctional) => {
            info.push_str(" | Pelvic floor dysfunction notes.");
        }
        _ => {}
    }
    info
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, pool: &'a [&'a str]) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

/// Synthesize `num_samples` records with an entropy-seeded generator.
///
/// # Errors
/// Propagates curve generation failures.
pub fn synthesize_dataset(num_samples: usize) -> Result<Vec<PatientRecord>, UroflowError> {
    let mut rng = ChaCha20Rng::from_entropy();
    synthesize_dataset_with_rng(&mut rng, num_samples)
}

/// Synthesize `num_samples` records reproducibly from `seed`.
///
/// # Errors
/// Propagates curve generation failures.
pub fn synthesize_dataset_seeded(
    num_samples: usize,
    seed: u64,
) -> Result<Vec<PatientRecord>, UroflowError> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    synthesize_dataset_with_rng(&mut rng, num_samples)
}

/// Synthesize records from a caller-supplied random source.
///
/// Records come back in generation order with ids `PID0001`, `PID0002`, ...
///
/// # Errors
/// Propagates curve generation failures.
pub fn synthesize_dataset_with_rng<R: Rng + ?Sized>(
    rng: &mut R,
    num_samples: usize,
) -> Result<Vec<PatientRecord>, UroflowError> {
    let mut records = Vec::with_capacity(num_samples);

    for i in 0..num_samples {
        let diagnosis = Diagnosis::ALL[rng.gen_range(0..Diagnosis::ALL.len())];
        let age: u32 = rng.gen_range(20..=80);
        let gender = if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        };
        let first_name = match gender {
            Gender::Male => pick(rng, &MALE_FIRST_NAMES),
            Gender::Female => pick(rng, &FEMALE_FIRST_NAMES),
        };
        let last_name = pick(rng, &LAST_NAMES);

        let profile = profile(diagnosis);
        let volume = f64::from(rng.gen_range(profile.volume.0..=profile.volume.1));
        let flow_time = f64::from(rng.gen_range(profile.flow_time.0..=profile.flow_time.1));
        let curve = generate_curve_with(
            rng,
            CurveKind::from(diagnosis),
            volume,
            flow_time,
            DEFAULT_NUM_POINTS,
        )?;
        let notes = pick(rng, profile.notes);

        let identity = PatientIdentity {
            id: format!("PID{:04}", i + 1),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
            gender,
            patient_info: patient_summary(first_name, last_name, age, gender, diagnosis),
        };
        records.push(PatientRecord::new(
            identity,
            volume,
            flow_time,
            notes.to_string(),
            curve,
            diagnosis,
        ));
    }

    tracing::info!("Synthesized dataset with {} records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::round2;

    #[test]
    fn test_ids_are_sequential() {
        let records = synthesize_dataset_seeded(12, 1).expect("Should synthesize");
        assert_eq!(records.len(), 12);
        assert_eq!(records[0].id, "PID0001");
        assert_eq!(records[11].id, "PID0012");
    }

    #[test]
    fn test_derived_statistics_match_curve() {
        for record in synthesize_dataset_seeded(60, 9).expect("Should synthesize") {
            let curve = record.flow_curve().as_slice();
            let max = curve.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = curve.iter().sum::<f64>() / curve.len() as f64;
            assert_eq!(record.qmax(), round2(max));
            assert_eq!(record.qave(), round2(mean));
            assert_eq!(curve.len(), DEFAULT_NUM_POINTS);
            assert_eq!(curve[0], 0.0);
            assert_eq!(curve[curve.len() - 1], 0.0);
        }
    }

    #[test]
    fn test_class_conditioned_ranges() {
        for record in synthesize_dataset_seeded(90, 3).expect("Should synthesize") {
            let p = profile(record.diagnosis);
            assert!(record.volume >= f64::from(p.volume.0) && record.volume <= f64::from(p.volume.1));
            assert!(
                record.flow_time >= f64::from(p.flow_time.0)
                    && record.flow_time <= f64::from(p.flow_time.1)
            );
            assert!(p.notes.contains(&record.clinical_notes.as_str()));
            assert!((20..=80).contains(&record.age));
        }
    }

    #[test]
    fn test_all_classes_present() {
        let records = synthesize_dataset_seeded(150, 42).expect("Should synthesize");
        for d in Diagnosis::ALL {
            assert!(records.iter().any(|r| r.diagnosis == d), "missing {d}");
        }
    }

    #[test]
    fn test_seed_reproducibility() {
        let a = synthesize_dataset_seeded(20, 5).expect("Should synthesize");
        let b = synthesize_dataset_seeded(20, 5).expect("Should synthesize");
        assert_eq!(a, b);
    }

    #[test]
    fn test_patient_summary_hints() {
        assert_eq!(
            patient_summary("James", "Smith", 64, Gender::Male, Diagnosis::Obstructive),
            "Patient: James Smith | Age: 64 | Gender: Male | Suspected BPH history."
        );
        assert_eq!(
            patient_summary("James", "Smith", 45, Gender::Male, Diagnosis::Obstructive),
            "Patient: James Smith | Age: 45 | Gender: Male"
        );
        assert!(patient_summary("Mary", "Clark", 30, Gender::Female, Diagnosis::Dysfunctional)
            .ends_with(" | Pelvic floor dysfunction notes."));
        assert!(!patient_summary("Mary", "Clark", 30, Gender::Female, Diagnosis::Normal)
            .contains(" | Pelvic"));
    }
}

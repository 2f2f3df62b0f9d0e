//! Stratified hold-out split and classification metrics.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default hold-out fraction.
pub const DEFAULT_TEST_FRACTION: f64 = 0.3;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition sample indices so every class keeps its proportion in both parts.
///
/// Each class contributes `round(count * test_fraction)` rows to the test set,
/// but always leaves at least one row for training. Both index lists are
/// returned in ascending order.
pub fn stratified_split<R: Rng + ?Sized>(
    labels: &[usize],
    n_classes: usize,
    test_fraction: f64,
    rng: &mut R,
) -> SplitIndices {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in 0..n_classes {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        members.shuffle(rng);

        let n_test = ((members.len() as f64 * fraction).round() as usize)
            .min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    SplitIndices { train, test }
}

/// Per-class hold-out metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    /// Number of true samples of this class in the evaluation set
    pub support: usize,
}

/// Diagnostic summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub accuracy: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub per_class: Vec<ClassMetrics>,
}

impl TrainingReport {
    /// Score predictions against ground truth. `labels[i]` names class `i`.
    #[must_use]
    pub fn evaluate(
        truth: &[usize],
        predicted: &[usize],
        labels: &[String],
        n_train: usize,
    ) -> Self {
        let k = labels.len();
        let mut tp = vec![0usize; k];
        let mut predicted_count = vec![0usize; k];
        let mut support = vec![0usize; k];

        for (&t, &p) in truth.iter().zip(predicted) {
            if t < k {
                support[t] += 1;
            }
            if p < k {
                predicted_count[p] += 1;
            }
            if t == p && t < k {
                tp[t] += 1;
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let correct: usize = tp.iter().sum();

        let per_class = labels
            .iter()
            .enumerate()
            .map(|(i, label)| ClassMetrics {
                label: label.clone(),
                precision: ratio(tp[i], predicted_count[i]),
                recall: ratio(tp[i], support[i]),
                support: support[i],
            })
            .collect();

        Self {
            accuracy: ratio(correct, truth.len()),
            n_train,
            n_test: truth.len(),
            per_class,
        }
    }
}

impl std::fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Accuracy: {:.4} (train={}, test={})",
            self.accuracy, self.n_train, self.n_test
        )?;
        writeln!(f, "{:<15} {:>9} {:>9} {:>9}", "class", "precision", "recall", "support")?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:<15} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.support
            )?;
        }
        Ok(())
    }
}

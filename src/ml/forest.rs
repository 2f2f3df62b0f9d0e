//! Random forest ensemble of bagged CART trees.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, TreeParams};
use crate::UroflowError;

/// Default number of trees.
pub const DEFAULT_N_TREES: usize = 100;

/// Default ensemble seed.
pub const DEFAULT_SEED: u64 = 42;

/// Random forest classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    n_trees: usize,
    /// Max depth per tree (`None` = unlimited)
    max_depth: Option<usize>,
    /// Minimum samples to split a node
    min_samples_split: usize,
    /// Random seed
    seed: u64,
    /// Feature width seen at fit time (0 until fitted)
    n_features: usize,
    /// Number of classes seen at fit time
    n_classes: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(DEFAULT_N_TREES)
    }
}

impl RandomForest {
    /// Create an unfitted forest.
    #[must_use]
    pub fn new(n_trees: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_trees: n_trees.max(1),
            max_depth: None,
            min_samples_split: 2,
            seed: DEFAULT_SEED,
            n_features: 0,
            n_classes: 0,
        }
    }

    /// Set seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Limit tree depth
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Fit the forest on row-major samples and class indices.
    ///
    /// Each tree sees a bootstrap sample of the full training size and
    /// considers `sqrt(n_features)` candidate features per split.
    ///
    /// # Errors
    /// Returns `Validation` for an empty or ragged matrix, a length mismatch
    /// between `x` and `y`, or a label `>= n_classes`.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), UroflowError> {
        if x.is_empty() {
            return Err(UroflowError::Validation(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(UroflowError::Validation(format!(
                "{} samples but {} labels",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if let Some(row) = x.iter().position(|r| r.len() != n_features) {
            return Err(UroflowError::Validation(format!(
                "row {row} has {} columns, expected {n_features}",
                x[row].len()
            )));
        }
        if let Some(&label) = y.iter().find(|&&l| l >= n_classes) {
            return Err(UroflowError::Validation(format!(
                "label {label} outside 0..{n_classes}"
            )));
        }

        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: ((n_features as f64).sqrt() as usize).max(1),
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let n = x.len();
        self.trees = (0..self.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut tree_rng = ChaCha8Rng::seed_from_u64(rng.gen());
                DecisionTree::fit(x, y, &bootstrap, n_classes, params, &mut tree_rng)
            })
            .collect();
        self.n_features = n_features;
        self.n_classes = n_classes;

        tracing::debug!(
            "Fitted random forest: {} trees, {} features, {} classes",
            self.trees.len(),
            n_features,
            n_classes
        );
        Ok(())
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Class probabilities: mean of the tree leaf distributions.
    ///
    /// # Errors
    /// Returns `ModelNotLoaded` before fitting and `SchemaMismatch` when `x`
    /// does not have the fitted width.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, UroflowError> {
        if !self.is_fitted() {
            return Err(UroflowError::ModelNotLoaded(
                "random forest has not been fitted".to_string(),
            ));
        }
        if x.len() != self.n_features {
            return Err(UroflowError::SchemaMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, v) in proba.iter_mut().zip(tree.predict_proba(x)) {
                *p += v;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }

    /// Predicted class index (lowest index wins ties).
    ///
    /// # Errors
    /// Same as [`predict_proba`](Self::predict_proba).
    pub fn predict(&self, x: &[f64]) -> Result<usize, UroflowError> {
        Ok(argmax(&self.predict_proba(x)?))
    }

    /// Mean impurity-based feature importances across trees.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (t, v) in total.iter_mut().zip(tree.feature_importances()) {
                *t += v;
            }
        }
        if !self.trees.is_empty() {
            let n = self.trees.len() as f64;
            total.iter_mut().for_each(|t| *t /= n);
        }
        total
    }
}

/// Index of the largest value; the first one wins ties.
#[must_use]
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well-separated blobs in 3 dimensions, third column is noise.
    fn blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let class = i % 2;
            let center = if class == 0 { 0.0 } else { 10.0 };
            x.push(vec![
                center + rng.gen_range(-1.0..1.0),
                center + rng.gen_range(-1.0..1.0),
                rng.gen_range(0.0..10.0),
            ]);
            y.push(class);
        }
        (x, y)
    }

    #[test]
    fn test_fit_and_predict() {
        let (x, y) = blobs();
        let mut forest = RandomForest::new(20);
        forest.fit(&x, &y, 2).expect("Should fit");

        assert!(forest.is_fitted());
        assert_eq!(forest.n_features(), 3);
        assert_eq!(forest.predict(&[0.2, -0.3, 5.0]).expect("predict"), 0);
        assert_eq!(forest.predict(&[9.8, 10.4, 5.0]).expect("predict"), 1);

        let proba = forest.predict_proba(&[9.8, 10.4, 5.0]).expect("proba");
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs();
        let mut a = RandomForest::new(10).with_seed(3);
        let mut b = RandomForest::new(10).with_seed(3);
        a.fit(&x, &y, 2).expect("fit");
        b.fit(&x, &y, 2).expect("fit");
        assert_eq!(a, b);
    }

    #[test]
    fn test_unfitted_forest() {
        let forest = RandomForest::default();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(UroflowError::ModelNotLoaded(_))
        ));
    }

    #[test]
    fn test_width_mismatch() {
        let (x, y) = blobs();
        let mut forest = RandomForest::new(5);
        forest.fit(&x, &y, 2).expect("fit");
        assert!(matches!(
            forest.predict_proba(&[1.0, 2.0]),
            Err(UroflowError::SchemaMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_invalid_training_data() {
        let mut forest = RandomForest::new(5);
        assert!(forest.fit(&[], &[], 2).is_err());
        assert!(forest.fit(&[vec![1.0], vec![1.0, 2.0]], &[0, 1], 2).is_err());
        assert!(forest.fit(&[vec![1.0]], &[0, 1], 2).is_err());
        assert!(forest.fit(&[vec![1.0]], &[5], 2).is_err());
    }

    #[test]
    fn test_argmax_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = blobs();
        let mut forest = RandomForest::new(10);
        forest.fit(&x, &y, 2).expect("fit");
        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}

//! CART decision tree for multi-class classification (Gini impurity).

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A node of a fitted tree, stored in a flat arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Samples with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class distribution of the training samples that reached this leaf.
    Leaf { distribution: Vec<f64> },
}

/// Training-time settings shared by every tree of a forest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth (`None` grows until leaves are pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Candidate features examined per split
    pub max_features: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: usize::MAX,
        }
    }
}

/// Decision tree classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_classes: usize,
    /// Unnormalized impurity decrease per feature
    importances: Vec<f64>,
}

struct Builder<'a, R: Rng + ?Sized> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    params: TreeParams,
    rng: &'a mut R,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn class_counts(y: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &i in indices {
        counts[y[i]] += 1;
    }
    counts
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

impl<R: Rng + ?Sized> Builder<'_, R> {
    fn leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let distribution = counts
            .iter()
            .map(|&c| c as f64 / total.max(1) as f64)
            .collect();
        self.nodes.push(TreeNode::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn build(&mut self, indices: &[usize], depth: usize) -> usize {
        let counts = class_counts(self.y, indices, self.n_classes);
        let total = indices.len();
        let impurity = gini(&counts, total);

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || total < self.params.min_samples_split || impurity <= 0.0 {
            return self.leaf(&counts, total);
        }

        let Some(best) = self.best_split(indices, &counts) else {
            return self.leaf(&counts, total);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[i][best.feature] <= best.threshold);

        self.importances[best.feature] += total as f64 * impurity - best.impurity;

        // Reserve the split slot before children so the root stays at index 0.
        let slot = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            distribution: Vec::new(),
        });
        let left = self.build(&left_idx, depth + 1);
        let right = self.build(&right_idx, depth + 1);
        self.nodes[slot] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        slot
    }

    /// Search features in random order; stop after `max_features` candidates
    /// once at least one valid split has been found.
    fn best_split(&mut self, indices: &[usize], counts: &[usize]) -> Option<BestSplit> {
        let n_features = self.x[indices[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(self.rng);

        let total = indices.len();
        let mut best: Option<BestSplit> = None;
        let mut pairs: Vec<(f64, usize)> = Vec::with_capacity(total);

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.params.max_features && best.is_some() {
                break;
            }

            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (self.x[i][feature], self.y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            if pairs[0].0 >= pairs[total - 1].0 {
                continue;
            }

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();
            for k in 0..total - 1 {
                let (value, label) = pairs[k];
                left[label] += 1;
                right[label] -= 1;

                let next = pairs[k + 1].0;
                if value >= next {
                    continue;
                }

                let n_left = k + 1;
                let n_right = total - n_left;
                let weighted = n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right);

                if best.as_ref().map_or(true, |b| weighted < b.impurity) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity: weighted,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    /// Fit on the rows of `x` selected by `indices` (duplicates allowed).
    ///
    /// `y[i]` must be below `n_classes` and all rows must share one width.
    pub fn fit<R: Rng + ?Sized>(
        x: &[Vec<f64>],
        y: &[usize],
        indices: &[usize],
        n_classes: usize,
        params: TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = indices.first().map_or(0, |&i| x[i].len());
        let mut builder = Builder {
            x,
            y,
            n_classes,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        if indices.is_empty() {
            builder.leaf(&vec![0; n_classes], 0);
        } else {
            builder.build(indices, 0);
        }

        Self {
            nodes: builder.nodes,
            n_classes,
            importances: builder.importances,
        }
    }

    /// Class distribution of the leaf reached by `x`.
    #[must_use]
    pub fn predict_proba(&self, x: &[f64]) -> &[f64] {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = x.get(*feature).copied().unwrap_or(0.0);
                    node = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Depth of the deepest leaf (root alone = 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], node: usize) -> usize {
            match &nodes[node] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }

    /// Impurity-based feature importances, normalized to sum to 1.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.importances.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.importances.len()];
        }
        self.importances.iter().map(|v| v / total).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fit_all(x: &[Vec<f64>], y: &[usize], n_classes: usize) -> DecisionTree {
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        DecisionTree::fit(x, y, &indices, n_classes, TreeParams::default(), &mut rng)
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn test_xor_is_learned() {
        let x = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
        ];
        let y = vec![0, 1, 1, 0];
        let tree = fit_all(&x, &y, 2);

        for (row, &label) in x.iter().zip(&y) {
            let p = tree.predict_proba(row);
            assert_eq!(p[label], 1.0);
        }
        assert!(tree.n_nodes() >= 7);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_threshold_is_midpoint() {
        let x = vec![vec![1.0], vec![2.0], vec![4.0], vec![6.0]];
        let y = vec![0, 0, 1, 1];
        let tree = fit_all(&x, &y, 2);
        assert_eq!(
            tree.nodes[0],
            TreeNode::Split {
                feature: 0,
                threshold: 3.0,
                left: 1,
                right: 2
            }
        );
        assert_eq!(tree.predict_proba(&[2.9]), &[1.0, 0.0]);
        assert_eq!(tree.predict_proba(&[3.1]), &[0.0, 1.0]);
    }

    #[test]
    fn test_constant_features_give_leaf() {
        let x = vec![vec![1.0, 5.0], vec![1.0, 5.0], vec![1.0, 5.0]];
        let y = vec![0, 1, 2];
        let tree = fit_all(&x, &y, 3);
        assert_eq!(tree.n_nodes(), 1);
        let p = tree.predict_proba(&[1.0, 5.0]);
        assert!(p.iter().all(|v| (v - 1.0 / 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_max_depth() {
        let x: Vec<Vec<f64>> = (0..16).map(|i| vec![f64::from(i)]).collect();
        let y: Vec<usize> = (0..16).map(|i| i % 2).collect();
        let indices: Vec<usize> = (0..16).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let params = TreeParams {
            max_depth: Some(2),
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(&x, &y, &indices, 2, params, &mut rng);
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_importances_favor_informative_feature() {
        let x = vec![
            vec![0.0, 7.0],
            vec![0.0, 3.0],
            vec![1.0, 3.0],
            vec![1.0, 7.0],
        ];
        let y = vec![0, 0, 1, 1];
        let tree = fit_all(&x, &y, 2);
        let imp = tree.feature_importances();
        assert!((imp[0] - 1.0).abs() < 1e-12);
        assert_eq!(imp[1], 0.0);
    }
}

//! Weighted entropy decision tree with per-node random feature sampling

use super::{class_index, unique_classes, Classifier};
use crate::error::{EventlabError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    /// Maximum depth, unlimited when `None`
    pub max_depth: Option<usize>,
    /// Features drawn at each node before settling for the best split
    pub max_features: usize,
    /// Minimum share of the total sample weight in each leaf
    pub min_weight_fraction_leaf: f64,
    /// Reweight classes inversely to their frequency
    pub balanced: bool,
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_features: 1,
            min_weight_fraction_leaf: 0.0,
            balanced: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn proba(&self, row: &[f64]) -> &[f64] {
        match self {
            TreeNode::Leaf { proba } => proba,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.proba(row)
                } else {
                    right.proba(row)
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    classes: Vec<i8>,
    root: Option<TreeNode>,
    feature_importances: Vec<f64>,
}

struct Sample<'a> {
    row: &'a [f64],
    class: usize,
    weight: f64,
}

struct Builder<'a> {
    config: &'a TreeConfig,
    n_classes: usize,
    n_features: usize,
    min_leaf_weight: f64,
    importances: Vec<f64>,
    rng: ChaCha8Rng,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            root: None,
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Normalized weighted impurity decrease per feature; all zeros for a
    /// tree that never split
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map(TreeNode::depth).unwrap_or(0)
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &[Vec<f64>], y: &[i8], sample_weight: Option<&[f64]>) -> Result<()> {
        super::check_training_set(x, y, sample_weight)?;
        if self.config.max_features == 0 {
            return Err(EventlabError::Configuration(
                "max_features must be at least 1".to_string(),
            ));
        }
        if !(0.0..=0.5).contains(&self.config.min_weight_fraction_leaf) {
            return Err(EventlabError::Configuration(format!(
                "min_weight_fraction_leaf must lie in [0, 0.5], got {}",
                self.config.min_weight_fraction_leaf
            )));
        }

        self.classes = unique_classes(y);
        let n_classes = self.classes.len();
        let n_features = x[0].len();

        let class_weight = if self.config.balanced {
            balanced_weights(&self.classes, y, sample_weight)
        } else {
            vec![1.0; n_classes]
        };

        let samples: Vec<Sample> = x
            .iter()
            .zip(y)
            .enumerate()
            .filter_map(|(i, (row, label))| {
                let class = class_index(&self.classes, *label)?;
                let weight = sample_weight.map(|w| w[i]).unwrap_or(1.0) * class_weight[class];
                (weight > 0.0).then_some(Sample {
                    row: row.as_slice(),
                    class,
                    weight,
                })
            })
            .collect();
        let total: f64 = samples.iter().map(|s| s.weight).sum();

        let mut builder = Builder {
            config: &self.config,
            n_classes,
            n_features,
            min_leaf_weight: self.config.min_weight_fraction_leaf * total,
            importances: vec![0.0; n_features],
            rng: ChaCha8Rng::seed_from_u64(self.config.seed),
        };
        let mut samples = samples;
        let root = builder.build(&mut samples, 0);

        let sum: f64 = builder.importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut builder.importances {
                *imp /= sum;
            }
        }
        self.feature_importances = builder.importances;
        self.root = Some(root);
        Ok(())
    }

    fn classes(&self) -> &[i8] {
        &self.classes
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| EventlabError::Validation("Decision tree is not fitted".to_string()))?;
        Ok(x.iter().map(|row| root.proba(row).to_vec()).collect())
    }

    fn tree_importances(&self) -> Option<Vec<Vec<f64>>> {
        self.root
            .as_ref()
            .map(|_| vec![self.feature_importances.clone()])
    }
}

/// `n / (n_classes * count_c)`, counts taken with sample weights
fn balanced_weights(classes: &[i8], y: &[i8], sample_weight: Option<&[f64]>) -> Vec<f64> {
    let mut counts = vec![0.0; classes.len()];
    for (i, label) in y.iter().enumerate() {
        if let Some(c) = class_index(classes, *label) {
            counts[c] += sample_weight.map(|w| w[i]).unwrap_or(1.0);
        }
    }
    let total: f64 = counts.iter().sum();
    counts
        .iter()
        .map(|&c| {
            if c > 0.0 {
                total / (classes.len() as f64 * c)
            } else {
                0.0
            }
        })
        .collect()
}

fn entropy(counts: &[f64], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

impl Builder<'_> {
    fn build(&mut self, samples: &mut [Sample], depth: usize) -> TreeNode {
        let mut counts = vec![0.0; self.n_classes];
        for s in samples.iter() {
            counts[s.class] += s.weight;
        }
        let total: f64 = counts.iter().sum();
        let impurity = entropy(&counts, total);

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || impurity <= MIN_GAIN || samples.len() < 2 {
            return leaf(counts, total);
        }

        let Some(best) = self.best_split(samples, total * impurity) else {
            return leaf(counts, total);
        };

        self.importances[best.feature] += best.gain;

        // partition in place: rows going left first
        let mut mid = 0;
        for i in 0..samples.len() {
            if samples[i].row[best.feature] <= best.threshold {
                samples.swap(i, mid);
                mid += 1;
            }
        }
        let (left, right) = samples.split_at_mut(mid);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    /// Inspect at least `max_features` random features, and keep going past
    /// that until some valid split turns up
    fn best_split(&mut self, samples: &mut [Sample], node_score: f64) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<BestSplit> = None;
        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.config.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.split_on(samples, feature, node_score) {
                if best.as_ref().map_or(true, |b| candidate.gain > b.gain) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn split_on(&self, samples: &mut [Sample], feature: usize, node_score: f64) -> Option<BestSplit> {
        samples.sort_by(|a, b| a.row[feature].total_cmp(&b.row[feature]));

        let mut right_counts = vec![0.0; self.n_classes];
        for s in samples.iter() {
            right_counts[s.class] += s.weight;
        }
        let total: f64 = right_counts.iter().sum();
        let mut left_counts = vec![0.0; self.n_classes];
        let mut left_total = 0.0;

        let mut best: Option<BestSplit> = None;
        for i in 0..samples.len() - 1 {
            let s = &samples[i];
            left_counts[s.class] += s.weight;
            right_counts[s.class] -= s.weight;
            left_total += s.weight;

            let (here, next) = (s.row[feature], samples[i + 1].row[feature]);
            if here == next {
                continue;
            }
            let right_total = total - left_total;
            if left_total < self.min_leaf_weight || right_total < self.min_leaf_weight {
                continue;
            }

            let children = left_total * entropy(&left_counts, left_total)
                + right_total * entropy(&right_counts, right_total);
            let gain = node_score - children;
            if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    gain,
                });
            }
        }
        best
    }
}

fn leaf(counts: Vec<f64>, total: f64) -> TreeNode {
    let proba = if total > 0.0 {
        counts.iter().map(|c| c / total).collect()
    } else {
        let n = counts.len().max(1) as f64;
        vec![1.0 / n; counts.len()]
    };
    TreeNode::Leaf { proba }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<i8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let noise = ((i * 7) % 11) as f64;
            if i % 2 == 0 {
                x.push(vec![-1.0 - i as f64 * 0.01, noise]);
                y.push(-1);
            } else {
                x.push(vec![1.0 + i as f64 * 0.01, noise]);
                y.push(1);
            }
        }
        (x, y)
    }

    #[test]
    fn test_fits_separable_data() {
        let (x, y) = separable();
        let mut tree = DecisionTree::new(TreeConfig {
            max_features: 2,
            ..Default::default()
        });
        tree.fit(&x, &y, None).unwrap();

        assert_eq!(tree.classes(), &[-1, 1]);
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.feature_importances(), &[1.0, 0.0]);
    }

    #[test]
    fn test_pure_node_is_a_leaf() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        let y = vec![1, 1, 1];
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&x, &y, None).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_proba(&[vec![5.0]]).unwrap(), vec![vec![1.0]]);
        assert!(tree.feature_importances().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_min_weight_fraction_limits_leaves() {
        let (x, y) = separable();
        let mut tree = DecisionTree::new(TreeConfig {
            max_features: 2,
            min_weight_fraction_leaf: 0.5,
            ..Default::default()
        });
        tree.fit(&x, &y, None).unwrap();
        // a split needs both halves to carry half the weight, which the
        // balanced classes allow exactly once
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_balanced_weights_equalize_classes() {
        let w = balanced_weights(&[0, 1], &[0, 0, 0, 1], None);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_tree_cannot_predict() {
        let tree = DecisionTree::new(TreeConfig::default());
        assert!(tree.predict_proba(&[vec![1.0]]).is_err());
    }
}

//! Bootstrap-aggregated decision trees

use super::tree::{DecisionTree, TreeConfig};
use super::{argmax, class_index, unique_classes, Classifier};
use crate::error::{EventlabError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaggingConfig {
    pub n_estimators: usize,
    /// Share of the training rows drawn for each tree
    pub max_samples: f64,
    /// Draw with replacement
    pub bootstrap: bool,
    /// Score each row with the trees that did not see it
    pub oob_score: bool,
    pub seed: u64,
    pub tree: TreeConfig,
}

impl Default for BaggingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 1.0,
            bootstrap: true,
            oob_score: true,
            seed: 42,
            tree: TreeConfig::default(),
        }
    }
}

/// Ensemble of trees, each grown on its own resample with seed `seed + i`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggedTrees {
    config: BaggingConfig,
    classes: Vec<i8>,
    trees: Vec<DecisionTree>,
    oob_score: Option<f64>,
}

impl BaggedTrees {
    pub fn new(config: BaggingConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            trees: Vec::new(),
            oob_score: None,
        }
    }

    pub fn config(&self) -> &BaggingConfig {
        &self.config
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Out-of-bag accuracy, when requested and at least one row was left out
    pub fn oob_score(&self) -> Option<f64> {
        self.oob_score
    }

    fn accumulate(&self, tree: &DecisionTree, proba: &[Vec<f64>], into: &mut [Vec<f64>], rows: &[usize]) {
        for (&row, p) in rows.iter().zip(proba) {
            for (k, class) in tree.classes().iter().enumerate() {
                if let Some(c) = class_index(&self.classes, *class) {
                    into[row][c] += p[k];
                }
            }
        }
    }

    fn compute_oob(&self, x: &[Vec<f64>], y: &[i8], in_bag: &[Vec<bool>]) -> Result<Option<f64>> {
        let n_classes = self.classes.len();
        let mut votes = vec![vec![0.0; n_classes]; x.len()];
        let mut seen = vec![false; x.len()];

        for (tree, bag) in self.trees.iter().zip(in_bag) {
            let rows: Vec<usize> = (0..x.len()).filter(|&i| !bag[i]).collect();
            if rows.is_empty() {
                continue;
            }
            let subset: Vec<Vec<f64>> = rows.iter().map(|&i| x[i].clone()).collect();
            let proba = tree.predict_proba(&subset)?;
            self.accumulate(tree, &proba, &mut votes, &rows);
            for &i in &rows {
                seen[i] = true;
            }
        }

        let scored: Vec<bool> = (0..x.len())
            .filter(|&i| seen[i])
            .map(|i| self.classes[argmax(&votes[i])] == y[i])
            .collect();
        if scored.len() < x.len() {
            log::debug!(
                "{} rows were never out of bag",
                x.len() - scored.len()
            );
        }
        if scored.is_empty() {
            return Ok(None);
        }
        let hits = scored.iter().filter(|&&hit| hit).count();
        Ok(Some(hits as f64 / scored.len() as f64))
    }
}

impl Classifier for BaggedTrees {
    fn fit(&mut self, x: &[Vec<f64>], y: &[i8], sample_weight: Option<&[f64]>) -> Result<()> {
        super::check_training_set(x, y, sample_weight)?;
        if self.config.n_estimators == 0 {
            return Err(EventlabError::Configuration(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.config.max_samples > 0.0 && self.config.max_samples <= 1.0) {
            return Err(EventlabError::Configuration(format!(
                "max_samples must lie in (0, 1], got {}",
                self.config.max_samples
            )));
        }

        let n = x.len();
        let draws = ((self.config.max_samples * n as f64).round() as usize).clamp(1, n);
        self.classes = unique_classes(y);

        let config = &self.config;
        let fitted: Vec<(DecisionTree, Vec<bool>)> = (0..config.n_estimators)
            .into_par_iter()
            .map(|i| -> Result<(DecisionTree, Vec<bool>)> {
                let seed = config.seed.wrapping_add(i as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // resampling is expressed as per-row multiplicities
                let mut counts = vec![0.0; n];
                if config.bootstrap {
                    for _ in 0..draws {
                        counts[rng.gen_range(0..n)] += 1.0;
                    }
                } else {
                    let mut rows: Vec<usize> = (0..n).collect();
                    rows.shuffle(&mut rng);
                    for &row in &rows[..draws] {
                        counts[row] = 1.0;
                    }
                }
                let in_bag: Vec<bool> = counts.iter().map(|&c| c > 0.0).collect();
                let weights: Vec<f64> = match sample_weight {
                    Some(w) => counts.iter().zip(w).map(|(c, w)| c * w).collect(),
                    None => counts,
                };

                let mut tree = DecisionTree::new(TreeConfig {
                    seed,
                    ..config.tree.clone()
                });
                tree.fit(x, y, Some(&weights))?;
                Ok((tree, in_bag))
            })
            .collect::<Result<_>>()?;

        let (trees, in_bag): (Vec<_>, Vec<_>) = fitted.into_iter().unzip();
        self.trees = trees;
        self.oob_score = if self.config.oob_score {
            self.compute_oob(x, y, &in_bag)?
        } else {
            None
        };

        log::debug!(
            "Fitted {} trees on {} rows, oob score {:?}",
            self.trees.len(),
            n,
            self.oob_score
        );
        Ok(())
    }

    fn classes(&self) -> &[i8] {
        &self.classes
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if self.trees.is_empty() {
            return Err(EventlabError::Validation(
                "Bagged ensemble is not fitted".to_string(),
            ));
        }

        let per_tree: Vec<Vec<Vec<f64>>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<_>>()?;

        let rows: Vec<usize> = (0..x.len()).collect();
        let mut total = vec![vec![0.0; self.classes.len()]; x.len()];
        for (tree, proba) in self.trees.iter().zip(&per_tree) {
            self.accumulate(tree, proba, &mut total, &rows);
        }

        let n_trees = self.trees.len() as f64;
        for row in &mut total {
            for p in row.iter_mut() {
                *p /= n_trees;
            }
        }
        Ok(total)
    }

    fn tree_importances(&self) -> Option<Vec<Vec<f64>>> {
        if self.trees.is_empty() {
            return None;
        }
        Some(
            self.trees
                .iter()
                .map(|t| t.feature_importances().to_vec())
                .collect(),
        )
    }
}

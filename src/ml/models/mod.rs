pub mod bagging;
pub mod tree;

pub use bagging::{BaggedTrees, BaggingConfig};
pub use tree::{DecisionTree, TreeConfig};

use crate::error::{EventlabError, Result};

/// Probabilistic classifier over row-major feature matrices.
///
/// Probability columns follow the order of [`Classifier::classes`].
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: &[Vec<f64>], y: &[i8], sample_weight: Option<&[f64]>) -> Result<()>;

    fn classes(&self) -> &[i8];

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<i8>> {
        let classes = self.classes();
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|proba| classes[argmax(proba)])
            .collect())
    }

    /// Normalized impurity importances of each fitted tree, for models made
    /// of trees
    fn tree_importances(&self) -> Option<Vec<Vec<f64>>> {
        None
    }
}

/// First index of the largest value
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

pub(crate) fn unique_classes(y: &[i8]) -> Vec<i8> {
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}

pub fn class_index(classes: &[i8], label: i8) -> Option<usize> {
    classes.binary_search(&label).ok()
}

pub(crate) fn check_training_set(
    x: &[Vec<f64>],
    y: &[i8],
    sample_weight: Option<&[f64]>,
) -> Result<()> {
    if x.is_empty() {
        return Err(EventlabError::Validation("Empty training set".to_string()));
    }
    if x.len() != y.len() || sample_weight.is_some_and(|w| w.len() != y.len()) {
        return Err(EventlabError::Validation(format!(
            "Training set has {} rows and {} labels",
            x.len(),
            y.len()
        )));
    }
    let width = x[0].len();
    if width == 0 || x.iter().any(|row| row.len() != width) {
        return Err(EventlabError::Validation(
            "Feature rows must share a non-zero width".to_string(),
        ));
    }
    Ok(())
}

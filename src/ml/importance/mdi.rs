use super::ImportanceTable;
use crate::error::{EventlabError, Result};
use crate::ml::models::Classifier;
use crate::ml::stats;
use crate::types::ImportanceRecord;

/// Mean decrease impurity of a fitted tree ensemble.
///
/// A zero importance means the tree never split on the feature, which with
/// `max_features = 1` says nothing about it, so zeros are left out of the
/// per-feature mean. Both columns are rescaled by the sum of the means.
pub fn mdi(fit: &dyn Classifier, names: &[String]) -> Result<ImportanceTable> {
    let per_tree = fit.tree_importances().ok_or_else(|| {
        EventlabError::Configuration("MDI needs a fitted tree ensemble".to_string())
    })?;
    if let Some(tree) = per_tree.iter().find(|t| t.len() != names.len()) {
        return Err(EventlabError::Validation(format!(
            "Tree reports {} importances for {} features",
            tree.len(),
            names.len()
        )));
    }

    let n_trees = per_tree.len() as f64;
    let mut records: Vec<ImportanceRecord> = names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let used: Vec<f64> = per_tree
                .iter()
                .map(|t| t[j])
                .filter(|v| *v != 0.0 && v.is_finite())
                .collect();
            ImportanceRecord {
                feature: name.clone(),
                mean: stats::mean(&used),
                std: stats::sample_std(&used) * n_trees.powf(-0.5),
            }
        })
        .collect();

    let total: f64 = records.iter().map(|r| r.mean).filter(|m| m.is_finite()).sum();
    if total > 0.0 {
        for r in &mut records {
            r.mean /= total;
            r.std /= total;
        }
    }

    Ok(ImportanceTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTrees(Vec<Vec<f64>>);

    impl Classifier for FixedTrees {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[i8], _w: Option<&[f64]>) -> Result<()> {
            Ok(())
        }

        fn classes(&self) -> &[i8] {
            &[]
        }

        fn predict_proba(&self, _x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
            Ok(Vec::new())
        }

        fn tree_importances(&self) -> Option<Vec<Vec<f64>>> {
            Some(self.0.clone())
        }
    }

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "unused".to_string()]
    }

    #[test]
    fn test_zero_importances_are_left_out() {
        // with one feature per split each tree credits a single feature
        let fit = FixedTrees(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
        ]);
        let table = mdi(&fit, &names()).unwrap();

        let a = table.get("a").unwrap();
        assert!((a.mean - 0.5).abs() < 1e-12);
        assert_eq!(a.std, 0.0);
        assert!(table.get("unused").unwrap().mean.is_nan());
    }

    #[test]
    fn test_means_rescaled_to_unit_sum() {
        let fit = FixedTrees(vec![vec![0.6, 0.4, 0.0], vec![0.2, 0.8, 0.0]]);
        let table = mdi(&fit, &names()).unwrap();
        let a = table.get("a").unwrap().mean;
        let b = table.get("b").unwrap().mean;
        assert!((a + b - 1.0).abs() < 1e-12);
        assert!((a - 0.4).abs() < 1e-12);
        // sample std of {0.6, 0.2} over sqrt(2) trees, then rescaled
        let expected = (0.08_f64).sqrt() / 2.0_f64.sqrt();
        assert!((table.get("a").unwrap().std - expected).abs() < 1e-12);
    }

    #[test]
    fn test_requires_tree_model() {
        struct Plain;
        impl Classifier for Plain {
            fn fit(&mut self, _x: &[Vec<f64>], _y: &[i8], _w: Option<&[f64]>) -> Result<()> {
                Ok(())
            }
            fn classes(&self) -> &[i8] {
                &[]
            }
            fn predict_proba(&self, _x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
                Ok(Vec::new())
            }
        }
        assert!(matches!(
            mdi(&Plain, &names()),
            Err(EventlabError::Configuration(_))
        ));
    }
}

pub mod mda;
pub mod mdi;
pub mod scoring;

pub use mda::mda;
pub use mdi::mdi;
pub use scoring::ScoringMethod;

use crate::error::{EventlabError, Result};
use crate::ml::models::Classifier;
use crate::ml::stats;
use crate::ml::validation::{LabelSpan, PurgedKFold};
use crate::types::ImportanceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportanceMethod {
    #[serde(rename = "MDI", alias = "mdi")]
    Mdi,
    #[default]
    #[serde(rename = "MDA", alias = "mda")]
    Mda,
}

impl FromStr for ImportanceMethod {
    type Err = EventlabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MDI" => Ok(ImportanceMethod::Mdi),
            "MDA" => Ok(ImportanceMethod::Mda),
            _ => Err(EventlabError::Configuration(format!(
                "Unsupported importance method '{}', expected MDI or MDA",
                s
            ))),
        }
    }
}

impl ImportanceMethod {
    /// Importance a feature must exceed to be kept
    fn cutoff(&self, table: &ImportanceTable) -> f64 {
        match self {
            ImportanceMethod::Mda => 0.0,
            ImportanceMethod::Mdi => table.mean_of_means(),
        }
    }
}

/// Per-feature importance, ordered by ascending mean
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportanceTable {
    records: Vec<ImportanceRecord>,
}

impl ImportanceTable {
    pub fn new(mut records: Vec<ImportanceRecord>) -> Self {
        records.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        Self { records }
    }

    pub fn records(&self) -> &[ImportanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, feature: &str) -> Option<&ImportanceRecord> {
        self.records.iter().find(|r| r.feature == feature)
    }

    fn mean_of_means(&self) -> f64 {
        let means: Vec<f64> = self
            .records
            .iter()
            .map(|r| r.mean)
            .filter(|m| m.is_finite())
            .collect();
        stats::mean(&means)
    }

    /// Combine tables computed per instrument: the mean of the means, and
    /// the dispersion of the reported stds scaled by `1/sqrt(tables)`
    pub fn join(tables: &[ImportanceTable]) -> ImportanceTable {
        let mut by_feature: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for table in tables {
            for r in &table.records {
                let entry = by_feature.entry(r.feature.as_str()).or_default();
                if r.mean.is_finite() {
                    entry.0.push(r.mean);
                }
                if r.std.is_finite() {
                    entry.1.push(r.std);
                }
            }
        }

        let scale = (tables.len() as f64).powf(-0.5);
        let records = by_feature
            .into_iter()
            .map(|(feature, (means, stds))| ImportanceRecord {
                feature: feature.to_string(),
                mean: stats::mean(&means),
                std: stats::sample_std(&stds) * scale,
            })
            .collect();
        ImportanceTable::new(records)
    }

    /// Columns, in their given order, whose importance beats the method's
    /// cutoff
    pub fn select(&self, columns: &[String], method: ImportanceMethod) -> Vec<String> {
        let cutoff = method.cutoff(self);
        let picked: Vec<String> = columns
            .iter()
            .filter(|c| self.get(c).is_some_and(|r| r.mean > cutoff))
            .cloned()
            .collect();
        log::info!(
            "Picked {}/{} important features: {:?}",
            picked.len(),
            columns.len(),
            picked
        );
        picked
    }
}

/// Runs the configured importance method against a classifier prototype
pub struct FeatureImportance {
    method: ImportanceMethod,
    scoring: ScoringMethod,
    cv: PurgedKFold,
    seed: u64,
}

impl FeatureImportance {
    pub fn new(method: ImportanceMethod, scoring: ScoringMethod, cv: PurgedKFold, seed: u64) -> Self {
        Self {
            method,
            scoring,
            cv,
            seed,
        }
    }

    pub fn method(&self) -> ImportanceMethod {
        self.method
    }

    /// `clf` is left untouched; fits happen on clones
    pub fn compute<C>(
        &self,
        clf: &C,
        spans: &[LabelSpan],
        x: &[Vec<f64>],
        y: &[i8],
        names: &[String],
    ) -> Result<ImportanceTable>
    where
        C: Classifier + Clone,
    {
        log::info!(
            "Feature importance ({:?}) for {} features on {} observations",
            self.method,
            names.len(),
            x.len()
        );
        match self.method {
            ImportanceMethod::Mdi => {
                let mut fit = clf.clone();
                fit.fit(x, y, None)?;
                mdi(&fit, names)
            }
            ImportanceMethod::Mda => mda(clf, &self.cv, spans, x, y, names, self.scoring, self.seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(feature: &str, mean: f64, std: f64) -> ImportanceRecord {
        ImportanceRecord {
            feature: feature.to_string(),
            mean,
            std,
        }
    }

    #[test]
    fn test_table_sorted_by_ascending_mean() {
        let table = ImportanceTable::new(vec![
            record("b", 0.4, 0.1),
            record("a", -0.1, 0.1),
            record("c", 0.2, 0.1),
        ]);
        let order: Vec<_> = table.records().iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_join_averages_means() {
        let a = ImportanceTable::new(vec![record("x", 0.2, 0.1), record("y", 0.0, 0.3)]);
        let b = ImportanceTable::new(vec![record("x", 0.4, 0.3), record("y", 0.2, 0.3)]);
        let joined = ImportanceTable::join(&[a, b]);

        let x = joined.get("x").unwrap();
        assert!((x.mean - 0.3).abs() < 1e-12);
        // std of {0.1, 0.3} is sqrt(0.02), scaled by 1/sqrt(2)
        assert!((x.std - 0.1).abs() < 1e-12);
        assert_eq!(joined.get("y").unwrap().std, 0.0);
    }

    #[test]
    fn test_select_uses_method_cutoff() {
        let table = ImportanceTable::new(vec![
            record("a", -0.05, 0.0),
            record("b", 0.1, 0.0),
            record("c", 0.5, 0.0),
        ]);
        let columns: Vec<String> = ["c", "a", "b"].iter().map(|s| s.to_string()).collect();

        assert_eq!(table.select(&columns, ImportanceMethod::Mda), vec!["c", "b"]);
        // mean of means is 0.1833...
        assert_eq!(table.select(&columns, ImportanceMethod::Mdi), vec!["c"]);
    }

    #[test]
    fn test_parse_importance_method() {
        assert_eq!("mdi".parse::<ImportanceMethod>().unwrap(), ImportanceMethod::Mdi);
        assert!("shap".parse::<ImportanceMethod>().is_err());
    }
}

use super::traits::ConfigSection;
use crate::error::{EventlabError, Result};
use crate::ml::importance::{ImportanceMethod, ScoringMethod};
use crate::ml::models::BaggingConfig;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Dataset window, train/test split and feature importance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportanceConfig {
    pub importance_method: ImportanceMethod,
    pub scoring_method: ScoringMethod,
    pub cv_folds: usize,
    pub embargo_pct: f64,
    /// Share of rows, oldest first, used for importance
    pub train_fraction: f64,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub seed: u64,
    pub bagging: BaggingConfig,
}

impl Default for ImportanceConfig {
    fn default() -> Self {
        Self {
            importance_method: ImportanceMethod::default(),
            scoring_method: ScoringMethod::default(),
            cv_folds: 5,
            embargo_pct: 0.0,
            train_fraction: 0.5,
            start_date: None,
            end_date: None,
            seed: 42,
            bagging: BaggingConfig::default(),
        }
    }
}

impl ConfigSection for ImportanceConfig {
    fn section_name() -> &'static str {
        "importance"
    }

    fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(EventlabError::Configuration(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if !(0.0..1.0).contains(&self.embargo_pct) {
            return Err(EventlabError::Configuration(format!(
                "embargo_pct must lie in [0, 1), got {}",
                self.embargo_pct
            )));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(EventlabError::Configuration(format!(
                "train_fraction must lie in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(EventlabError::Configuration(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
        }
        let bagging = &self.bagging;
        if bagging.n_estimators == 0 {
            return Err(EventlabError::Configuration(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(bagging.max_samples > 0.0 && bagging.max_samples <= 1.0) {
            return Err(EventlabError::Configuration(format!(
                "max_samples must lie in (0, 1], got {}",
                bagging.max_samples
            )));
        }
        if bagging.tree.max_features == 0 {
            return Err(EventlabError::Configuration(
                "max_features must be at least 1".to_string(),
            ));
        }
        if !(0.0..=0.5).contains(&bagging.tree.min_weight_fraction_leaf) {
            return Err(EventlabError::Configuration(format!(
                "min_weight_fraction_leaf must lie in [0, 0.5], got {}",
                bagging.tree.min_weight_fraction_leaf
            )));
        }
        Ok(())
    }
}

use super::traits::ConfigSection;
use crate::error::{EventlabError, Result};
use crate::ml::labeling::{BarrierConfig, LabelingMethod};
use crate::ml::signals::AlphaModel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelingConfig {
    pub method: LabelingMethod,
    pub barrier: BarrierConfig,
    /// Events until the horizon closes, for fixed-horizon labeling
    pub fixed_horizon_window: usize,
    /// Rarest class share tolerated before pruning
    pub drop_pct: f64,
    /// Warn when a price lookup skips further than this
    pub max_lookup_gap_hours: Option<f64>,
    pub alpha: AlphaModel,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            method: LabelingMethod::TripleBarrier,
            barrier: BarrierConfig::default(),
            fixed_horizon_window: 100,
            drop_pct: 0.2,
            max_lookup_gap_hours: None,
            alpha: AlphaModel::default(),
        }
    }
}

impl ConfigSection for LabelingConfig {
    fn section_name() -> &'static str {
        "labeling"
    }

    fn validate(&self) -> Result<()> {
        self.barrier.validate()?;
        self.alpha.validate()?;
        if self.method == LabelingMethod::FixedHorizon && self.fixed_horizon_window == 0 {
            return Err(EventlabError::Configuration(
                "fixed_horizon_window must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.drop_pct) {
            return Err(EventlabError::Configuration(format!(
                "drop_pct must lie in [0, 1), got {}",
                self.drop_pct
            )));
        }
        if self.max_lookup_gap_hours.is_some_and(|h| !h.is_finite() || h <= 0.0) {
            return Err(EventlabError::Configuration(
                "max_lookup_gap_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

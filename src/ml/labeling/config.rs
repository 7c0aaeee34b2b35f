use crate::error::{EventlabError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BarrierConfig {
    /// Holding period in days for the vertical barrier; `None` disables it
    pub num_days: Option<f64>,
    pub pt: f64,
    pub sl: f64,
    /// Events whose target is not above this are dropped
    pub min_ret: f64,
    /// Target = volatility estimate * multiplier
    pub target_multiplier: f64,
    pub num_workers: usize,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            num_days: Some(100.0),
            pt: 1.0,
            sl: 1.0,
            min_ret: 0.0,
            target_multiplier: 1.0,
            num_workers: 4,
        }
    }
}

impl BarrierConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.pt.is_finite() || self.pt < 0.0 || !self.sl.is_finite() || self.sl < 0.0 {
            return Err(EventlabError::Configuration(format!(
                "Barrier multipliers must be non-negative, got pt={} sl={}",
                self.pt, self.sl
            )));
        }
        if self.pt == 0.0 && self.sl == 0.0 && self.num_days.is_none() {
            return Err(EventlabError::Configuration(
                "pt = sl = 0 requires a vertical barrier, otherwise no event can resolve"
                    .to_string(),
            ));
        }
        if let Some(days) = self.num_days {
            if !days.is_finite() || days <= 0.0 {
                return Err(EventlabError::Configuration(format!(
                    "num_days must be positive, got {}",
                    days
                )));
            }
        }
        // a target must stay strictly positive, so the floor cannot go below zero
        if self.min_ret.is_nan() || self.min_ret < 0.0 {
            return Err(EventlabError::Configuration(format!(
                "min_ret must be non-negative, got {}",
                self.min_ret
            )));
        }
        if !self.target_multiplier.is_finite() || self.target_multiplier <= 0.0 {
            return Err(EventlabError::Configuration(format!(
                "target_multiplier must be positive, got {}",
                self.target_multiplier
            )));
        }
        if self.num_workers == 0 {
            return Err(EventlabError::Configuration(
                "num_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelingMethod {
    #[default]
    TripleBarrier,
    FixedHorizon,
}

/// Which barrier ended an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierType {
    Upper,    // profit take
    Lower,    // stop loss
    Vertical, // time limit
}

impl std::fmt::Display for BarrierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BarrierType::Upper => "upper",
            BarrierType::Lower => "lower",
            BarrierType::Vertical => "vertical",
        };
        write!(f, "{}", name)
    }
}

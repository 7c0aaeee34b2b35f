use super::traits::ConfigSection;
use crate::error::{EventlabError, Result};
use crate::ml::filtering::CusumMode;
use serde::{Deserialize, Serialize};

/// Volatility estimate and CUSUM event sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    /// EWM span of the return volatility
    pub vol_span: usize,
    /// Fixed CUSUM threshold; the mean volatility when unset
    pub cusum_threshold: Option<f64>,
    pub cusum_mode: CusumMode,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            vol_span: 100,
            cusum_threshold: None,
            cusum_mode: CusumMode::default(),
        }
    }
}

impl ConfigSection for SamplingConfig {
    fn section_name() -> &'static str {
        "sampling"
    }

    fn validate(&self) -> Result<()> {
        if self.vol_span < 2 {
            return Err(EventlabError::Configuration(format!(
                "vol_span must be at least 2, got {}",
                self.vol_span
            )));
        }
        if let Some(h) = self.cusum_threshold {
            if !h.is_finite() || h <= 0.0 {
                return Err(EventlabError::Configuration(format!(
                    "cusum_threshold must be positive, got {}",
                    h
                )));
            }
        }
        Ok(())
    }
}

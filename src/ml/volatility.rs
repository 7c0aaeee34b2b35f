use super::stats;
use crate::error::Result;
use crate::types::TimeSeries;

/// Exponentially-weighted volatility of simple returns
#[derive(Debug, Clone, Copy)]
pub struct VolatilityEstimator {
    span: usize,
}

impl VolatilityEstimator {
    pub fn new(span: usize) -> Self {
        Self { span: span.max(1) }
    }

    pub fn span(&self) -> usize {
        self.span
    }

    /// Same-length series; NaN until `span` returns have been observed
    pub fn estimate(&self, close: &TimeSeries) -> Result<TimeSeries> {
        let returns = stats::pct_change(close.values());
        let vol = stats::ewm_std(&returns, self.span, self.span)?;
        Ok(close.derive(vol))
    }
}

use serde::{Deserialize, Serialize};

/// Primary model deciding the side of each event
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlphaModel {
    /// No primary model; bins follow the sign of the return
    #[default]
    None,
    /// Long while the fast moving average is at or above the slow one
    MaCross { fast: usize, slow: usize },
    /// Fade moves outside the Bollinger bands
    BollingerMeanReverting { window: usize, stdev: f64 },
    /// Follow moves outside the Bollinger bands
    BollingerTrendFollowing { window: usize, stdev: f64 },
}

impl AlphaModel {
    pub fn is_active(&self) -> bool {
        !matches!(self, AlphaModel::None)
    }
}

//! Capabilities supplied by the market-data layer.
//!
//! Bar aggregation and microstructure measures depend on raw trade data the
//! core never sees. Callers implement [`MarketCapabilities`] and hand it to the
//! feature engineer and pipeline.

use crate::error::Result;
use crate::types::{Bars, TimeSeries, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: Timestamp,
    pub price: f64,
    pub volume: f64,
    /// Aggressor was the buyer
    pub buy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicrostructureKind {
    /// Roll's effective spread estimate
    Roll,
    /// Roll measure over dollar volume
    RollImpact,
    /// Kyle's lambda
    Kyle,
    /// Amihud's lambda
    Amihud,
}

pub trait MarketCapabilities: Send + Sync {
    /// Aggregate trades into information-driven bars closing every `threshold`
    /// units of the implementation's bar measure
    fn aggregate_bars(&self, trades: &[Trade], threshold: f64) -> Result<Bars>;

    /// Microstructure measure on `bars` over a rolling `window`, aligned to the
    /// bar index
    fn microstructure_feature(
        &self,
        kind: MicrostructureKind,
        bars: &Bars,
        window: usize,
    ) -> Result<TimeSeries>;
}

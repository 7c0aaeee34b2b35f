use crate::error::{EventlabError, Result};
use crate::types::{TimeSeries, Timestamp};
use serde::{Deserialize, Serialize};

/// Which accumulator the upward trigger inspects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CusumMode {
    /// Both checks read the negative accumulator, so only downward
    /// deviations ever fire
    #[default]
    Reference,
    /// Upward trigger reads the positive accumulator
    Symmetric,
}

/// CUSUM filter sampling events on cumulative deviation
#[derive(Debug, Clone, Copy)]
pub struct CusumSampler {
    threshold: f64,
    mode: CusumMode,
}

impl CusumSampler {
    pub fn new(threshold: f64, mode: CusumMode) -> Result<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(EventlabError::Configuration(format!(
                "CUSUM threshold must be positive, got {}",
                threshold
            )));
        }
        Ok(Self { threshold, mode })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn mode(&self) -> CusumMode {
        self.mode
    }

    /// Lazy stream of trigger timestamps. Each call starts from a fresh state.
    pub fn events<'a>(&self, series: &'a TimeSeries) -> CusumEvents<'a> {
        CusumEvents {
            series,
            threshold: self.threshold,
            mode: self.mode,
            pos: 1,
            s_pos: 0.0,
            s_neg: 0.0,
        }
    }

    pub fn sample(&self, series: &TimeSeries) -> Vec<Timestamp> {
        let events: Vec<Timestamp> = self.events(series).collect();
        log::debug!(
            "CUSUM(h={:.6}, {:?}) sampled {} of {} observations",
            self.threshold,
            self.mode,
            events.len(),
            series.len()
        );
        events
    }
}

#[derive(Debug, Clone)]
pub struct CusumEvents<'a> {
    series: &'a TimeSeries,
    threshold: f64,
    mode: CusumMode,
    pos: usize,
    s_pos: f64,
    s_neg: f64,
}

impl Iterator for CusumEvents<'_> {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Timestamp> {
        let values = self.series.values();
        let index = self.series.index();

        while self.pos < values.len() {
            let i = self.pos;
            self.pos += 1;

            let delta = values[i] - values[i - 1];
            if delta.is_nan() {
                // an undefined step clears both accumulators
                self.s_pos = 0.0;
                self.s_neg = 0.0;
                continue;
            }

            self.s_pos = (self.s_pos + delta).max(0.0);
            self.s_neg = (self.s_neg + delta).min(0.0);

            if self.s_neg < -self.threshold {
                self.s_neg = 0.0;
                return Some(index[i]);
            }

            let upward = match self.mode {
                CusumMode::Reference => self.s_neg > self.threshold,
                CusumMode::Symmetric => self.s_pos > self.threshold,
            };
            if upward {
                self.s_pos = 0.0;
                return Some(index[i]);
            }
        }

        None
    }
}

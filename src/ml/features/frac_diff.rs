//! Fixed-width window fractional differentiation (FFD).
//!
//! The binomial weights of `(1 - B)^d` decay towards zero; the window is cut
//! where `|w_k|` falls below `thres`, trading memory for a finite, stationary
//! convolution.

use crate::ml::stats;
use crate::error::{EventlabError, Result};
use crate::types::TimeSeries;

#[derive(Debug, Clone)]
pub struct FracDiff {
    d: f64,
    thres: f64,
    weights: Vec<f64>,
}

impl FracDiff {
    pub fn new(d: f64, thres: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&d) {
            return Err(EventlabError::Configuration(format!(
                "Fractional order d must lie in [0, 1], got {}",
                d
            )));
        }
        if !thres.is_finite() || thres <= 0.0 {
            return Err(EventlabError::Configuration(format!(
                "Weight tolerance must be positive, got {}",
                thres
            )));
        }
        Ok(Self {
            d,
            thres,
            weights: Self::weights(d, thres),
        })
    }

    /// Weights ordered oldest first; the last element is `w_0 = 1`
    pub fn weights(d: f64, thres: f64) -> Vec<f64> {
        let mut w = vec![1.0];
        let mut k = 1.0;
        loop {
            let next = -w[w.len() - 1] / k * (d - k + 1.0);
            if next.abs() < thres {
                break;
            }
            w.push(next);
            k += 1.0;
        }
        w.reverse();
        w
    }

    pub fn order(&self) -> f64 {
        self.d
    }

    pub fn tolerance(&self) -> f64 {
        self.thres
    }

    /// Number of past observations each output value depends on
    pub fn width(&self) -> usize {
        self.weights.len() - 1
    }

    pub fn apply_values(&self, values: &[f64]) -> Vec<f64> {
        let width = self.width();
        let filled = stats::forward_fill(values);
        let mut out = vec![f64::NAN; values.len()];

        let Some(first) = filled.iter().position(|v| v.is_finite()) else {
            return out;
        };

        for i in (first + width)..values.len() {
            if !values[i].is_finite() {
                continue;
            }
            let window = &filled[i - width..=i];
            out[i] = self
                .weights
                .iter()
                .zip(window)
                .map(|(w, x)| w * x)
                .sum();
        }

        out
    }

    pub fn apply(&self, series: &TimeSeries) -> TimeSeries {
        series.derive(self.apply_values(series.values()))
    }
}

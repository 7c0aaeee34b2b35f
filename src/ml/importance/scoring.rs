use crate::error::{EventlabError, Result};
use crate::ml::models::{class_index, Classifier};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const LOG_LOSS_EPS: f64 = 1e-15;

/// Out-of-sample score used by MDA; higher is better for both
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    #[default]
    Accuracy,
    NegLogLoss,
}

impl FromStr for ScoringMethod {
    type Err = EventlabError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accuracy" => Ok(ScoringMethod::Accuracy),
            "neg_log_loss" => Ok(ScoringMethod::NegLogLoss),
            other => Err(EventlabError::Configuration(format!(
                "Unsupported scoring method '{}', expected accuracy or neg_log_loss",
                other
            ))),
        }
    }
}

impl ScoringMethod {
    pub fn score(&self, model: &dyn Classifier, x: &[Vec<f64>], y: &[i8]) -> Result<f64> {
        if y.is_empty() {
            return Err(EventlabError::Validation("Cannot score an empty set".to_string()));
        }
        match self {
            ScoringMethod::Accuracy => {
                let predicted = model.predict(x)?;
                Ok(accuracy(y, &predicted))
            }
            ScoringMethod::NegLogLoss => {
                let proba = model.predict_proba(x)?;
                Ok(-log_loss(model.classes(), y, &proba))
            }
        }
    }

    /// Relative score loss after permuting a feature; zero when the best
    /// attainable improvement over the permuted score vanishes
    pub fn degradation(&self, base: f64, permuted: f64) -> f64 {
        let scale = match self {
            ScoringMethod::Accuracy => 1.0 - permuted,
            ScoringMethod::NegLogLoss => -permuted,
        };
        if scale.abs() < 1e-12 {
            0.0
        } else {
            (base - permuted) / scale
        }
    }
}

pub fn accuracy(y: &[i8], predicted: &[i8]) -> f64 {
    let hits = y.iter().zip(predicted).filter(|(a, b)| a == b).count();
    hits as f64 / y.len() as f64
}

/// Mean cross-entropy with probabilities clipped to `[eps, 1 - eps]` and
/// renormalized per row
pub fn log_loss(classes: &[i8], y: &[i8], proba: &[Vec<f64>]) -> f64 {
    let total: f64 = y
        .iter()
        .zip(proba)
        .map(|(label, row)| {
            let clipped: Vec<f64> = row
                .iter()
                .map(|p| p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS))
                .collect();
            let norm: f64 = clipped.iter().sum();
            let p = class_index(classes, *label)
                .map(|k| clipped[k] / norm)
                .unwrap_or(LOG_LOSS_EPS);
            -p.ln()
        })
        .sum();
    total / y.len() as f64
}

use super::traits::ConfigSection;
use crate::error::{EventlabError, Result};
use crate::ml::features::{FeatureKind, FeatureSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Feature definitions evaluated for every instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeaturesConfig {
    pub specs: Vec<FeatureSpec>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        let log = FeatureSpec::new(FeatureKind::Log);
        Self {
            specs: vec![
                log.clone(),
                FeatureSpec::new(FeatureKind::Ffd { d: 0.4, thres: 1e-4 }),
                FeatureSpec::new(FeatureKind::Stdev { window: 50 }).on(log.clone()),
                FeatureSpec::new(FeatureKind::Auto { window: 50, lag: 1 }).on(log),
            ],
        }
    }
}

fn check_spec(spec: &FeatureSpec) -> Result<()> {
    let invalid = |msg: String| Err(EventlabError::Configuration(msg));
    match &spec.kind {
        FeatureKind::Ffd { d, thres } if !(0.0..=1.0).contains(d) || *thres <= 0.0 => {
            return invalid(format!("Invalid FFD parameters d={} thres={}", d, thres));
        }
        FeatureKind::Stdev { window } if *window < 2 => {
            return invalid(format!("stdev window must be at least 2, got {}", window));
        }
        FeatureKind::Auto { window, lag } if *lag == 0 || lag >= window => {
            return invalid(format!(
                "auto needs 0 < lag < window, got window={} lag={}",
                window, lag
            ));
        }
        FeatureKind::Volratio { com } if !com.is_finite() || *com < 0.0 => {
            return invalid(format!("volratio com must be non-negative, got {}", com));
        }
        FeatureKind::Microstructure { window, .. } if *window == 0 => {
            return invalid("microstructure window must be positive".to_string());
        }
        _ => {}
    }
    match &spec.input {
        Some(input) => check_spec(input),
        None => Ok(()),
    }
}

impl ConfigSection for FeaturesConfig {
    fn section_name() -> &'static str {
        "features"
    }

    fn validate(&self) -> Result<()> {
        if self.specs.is_empty() {
            return Err(EventlabError::Configuration(
                "At least one feature is required".to_string(),
            ));
        }
        let mut names = HashSet::new();
        for spec in &self.specs {
            check_spec(spec)?;
            if !names.insert(spec.name()) {
                return Err(EventlabError::Configuration(format!(
                    "Feature {} is defined twice",
                    spec.name()
                )));
            }
        }
        Ok(())
    }
}

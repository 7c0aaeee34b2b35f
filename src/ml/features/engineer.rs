use super::frac_diff::FracDiff;
use super::microstructure::{MarketCapabilities, MicrostructureKind};
use crate::error::{EventlabError, Result};
use crate::ml::stats;
use crate::types::{Bars, TimeSeries};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

fn default_ffd_thres() -> f64 {
    1e-5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Raw close
    Close,
    /// First difference of log prices
    Log,
    /// Fractionally differentiated log prices
    Ffd {
        d: f64,
        #[serde(default = "default_ffd_thres")]
        thres: f64,
    },
    /// Rolling standard deviation of the close
    Stdev { window: usize },
    /// Rolling serial correlation of the close
    Auto { window: usize, lag: usize },
    /// EWM of buy volume over total volume
    Volratio { com: f64 },
    /// Measure provided by the market-data layer
    Microstructure {
        measure: MicrostructureKind,
        window: usize,
    },
}

/// A feature definition. With an `input`, the feature is computed on the
/// values of that feature instead of the close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    #[serde(flatten)]
    pub kind: FeatureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Box<FeatureSpec>>,
}

impl FeatureSpec {
    pub fn new(kind: FeatureKind) -> Self {
        Self { kind, input: None }
    }

    pub fn on(mut self, input: FeatureSpec) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Column name, e.g. `auto_50_25` or `stdev_50_of_ffd_0.5`
    pub fn name(&self) -> String {
        let own = match &self.kind {
            FeatureKind::Close => "close".to_string(),
            FeatureKind::Log => "log".to_string(),
            FeatureKind::Ffd { d, .. } => format!("ffd_{}", d),
            FeatureKind::Stdev { window } => format!("stdev_{}", window),
            FeatureKind::Auto { window, lag } => format!("auto_{}_{}", window, lag),
            FeatureKind::Volratio { com } => format!("volratio_{}", com),
            FeatureKind::Microstructure { measure, window } => {
                let measure = serde_json::to_value(measure)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| format!("{:?}", measure).to_lowercase());
                format!("{}_{}", measure, window)
            }
        };
        match &self.input {
            Some(input) => format!("{}_of_{}", own, input.name()),
            None => own,
        }
    }

    /// Canonical key identifying this computation, input chain included
    pub fn fingerprint(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Evaluates feature definitions over one instrument's bars.
///
/// Results are memoized by fingerprint, so shared inputs (e.g. an FFD series
/// feeding several rolling features) are computed once.
pub struct FeatureEngineer<'a> {
    bars: &'a Bars,
    capabilities: Option<&'a dyn MarketCapabilities>,
    arena: HashMap<String, Arc<TimeSeries>>,
}

impl<'a> FeatureEngineer<'a> {
    pub fn new(bars: &'a Bars) -> Self {
        Self {
            bars,
            capabilities: None,
            arena: HashMap::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: &'a dyn MarketCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn cached(&self) -> usize {
        self.arena.len()
    }

    pub fn evaluate(&mut self, spec: &FeatureSpec) -> Result<Arc<TimeSeries>> {
        let key = spec.fingerprint()?;
        if let Some(hit) = self.arena.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let series = match &spec.input {
            Some(input) => {
                let upstream = self.evaluate(input)?;
                let bars = Bars::from_close(upstream.as_ref().clone());
                self.compute(&spec.kind, &bars)?
            }
            None => self.compute(&spec.kind, self.bars)?,
        };

        log::debug!("Computed feature {}", spec.name());
        let series = Arc::new(series);
        self.arena.insert(key, Arc::clone(&series));
        Ok(series)
    }

    /// Evaluate every definition, keeping the given order
    pub fn engineer(&mut self, specs: &[FeatureSpec]) -> Result<Vec<(String, Arc<TimeSeries>)>> {
        specs
            .iter()
            .map(|spec| Ok((spec.name(), self.evaluate(spec)?)))
            .collect()
    }

    fn compute(&self, kind: &FeatureKind, bars: &Bars) -> Result<TimeSeries> {
        let close = &bars.close;
        let series = match kind {
            FeatureKind::Close => close.clone(),
            FeatureKind::Log => close.derive(stats::diff(close.map(f64::ln).values())),
            FeatureKind::Ffd { d, thres } => FracDiff::new(*d, *thres)?.apply(&close.map(f64::ln)),
            FeatureKind::Stdev { window } => {
                close.derive(stats::rolling_std(close.values(), *window)?)
            }
            FeatureKind::Auto { window, lag } => {
                if *lag == 0 || lag >= window {
                    return Err(EventlabError::Configuration(format!(
                        "Autocorrelation lag must be in 1..{}, got {}",
                        window, lag
                    )));
                }
                close.derive(stats::rolling_autocorr(close.values(), *window, *lag))
            }
            FeatureKind::Volratio { com } => {
                let (Some(buy), Some(volume)) = (&bars.buy_volume, &bars.volume) else {
                    return Err(EventlabError::Configuration(
                        "volratio needs buy volume and volume columns".to_string(),
                    ));
                };
                let ratio: Vec<f64> = buy.iter().zip(volume).map(|(b, v)| b / v).collect();
                close.derive(stats::ewm_mean(&ratio, *com)?)
            }
            FeatureKind::Microstructure { measure, window } => {
                let capabilities = self.capabilities.ok_or_else(|| {
                    EventlabError::Configuration(format!(
                        "{:?} needs market capabilities, none were supplied",
                        measure
                    ))
                })?;
                let series = capabilities.microstructure_feature(*measure, bars, *window)?;
                if series.index() != close.index() {
                    return Err(EventlabError::Validation(format!(
                        "{:?} returned a series not aligned with the bars",
                        measure
                    )));
                }
                series
            }
        };
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::microstructure::Trade;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bars(values: Vec<f64>) -> Bars {
        let start = Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap();
        let index = (0..values.len())
            .map(|i| start + Duration::minutes(i as i64))
            .collect();
        Bars::from_close(TimeSeries::new(index, values).unwrap())
    }

    struct CountingCapabilities {
        calls: AtomicUsize,
    }

    impl MarketCapabilities for CountingCapabilities {
        fn aggregate_bars(&self, _trades: &[Trade], _threshold: f64) -> Result<Bars> {
            Err(EventlabError::Computation("not used".to_string()))
        }

        fn microstructure_feature(
            &self,
            _kind: MicrostructureKind,
            bars: &Bars,
            window: usize,
        ) -> Result<TimeSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(bars.close.map(|v| v * window as f64))
        }
    }

    #[test]
    fn test_names_include_input_chain() {
        let ffd = FeatureSpec::new(FeatureKind::Ffd { d: 0.5, thres: 1e-4 });
        let spec = FeatureSpec::new(FeatureKind::Stdev { window: 50 }).on(ffd);
        assert_eq!(spec.name(), "stdev_50_of_ffd_0.5");
        assert_eq!(
            FeatureSpec::new(FeatureKind::Microstructure {
                measure: MicrostructureKind::RollImpact,
                window: 20
            })
            .name(),
            "roll_impact_20"
        );
    }

    #[test]
    fn test_spec_parses_from_json() {
        let spec: FeatureSpec = serde_json::from_str(
            r#"{"name": "stdev", "window": 5, "input": {"name": "ffd", "d": 0.4}}"#,
        )
        .unwrap();
        assert_eq!(spec.kind, FeatureKind::Stdev { window: 5 });
        assert_eq!(
            spec.input.unwrap().kind,
            FeatureKind::Ffd { d: 0.4, thres: 1e-5 }
        );
    }

    #[test]
    fn test_log_feature_is_log_return() {
        let b = bars(vec![100.0, 110.0, 99.0]);
        let mut engineer = FeatureEngineer::new(&b);
        let log = engineer.evaluate(&FeatureSpec::new(FeatureKind::Log)).unwrap();
        assert!(log.values()[0].is_nan());
        assert!((log.values()[1] - 1.1_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_shared_input_is_computed_once() {
        let b = bars((1..=30).map(|i| i as f64).collect());
        let caps = CountingCapabilities {
            calls: AtomicUsize::new(0),
        };
        let roll = FeatureSpec::new(FeatureKind::Microstructure {
            measure: MicrostructureKind::Roll,
            window: 2,
        });
        let specs = vec![
            FeatureSpec::new(FeatureKind::Stdev { window: 3 }).on(roll.clone()),
            FeatureSpec::new(FeatureKind::Auto { window: 5, lag: 1 }).on(roll.clone()),
            roll,
        ];

        let mut engineer = FeatureEngineer::new(&b).with_capabilities(&caps);
        let columns = engineer.engineer(&specs).unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(caps.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engineer.cached(), 3);
        // stdev of 2, 4, 6 is 2
        assert!((columns[0].1.values()[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_volratio_needs_volume_columns() {
        let mut b = bars(vec![1.0, 2.0, 3.0]);
        let spec = FeatureSpec::new(FeatureKind::Volratio { com: 2.0 });
        assert!(FeatureEngineer::new(&b).evaluate(&spec).is_err());

        b.volume = Some(vec![10.0, 10.0, 10.0]);
        b.buy_volume = Some(vec![5.0, 5.0, 5.0]);
        let ratio = FeatureEngineer::new(&b).evaluate(&spec).unwrap();
        assert!(ratio.values().iter().all(|v| (v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_microstructure_without_capabilities_fails() {
        let b = bars(vec![1.0, 2.0]);
        let spec = FeatureSpec::new(FeatureKind::Microstructure {
            measure: MicrostructureKind::Kyle,
            window: 2,
        });
        assert!(matches!(
            FeatureEngineer::new(&b).evaluate(&spec),
            Err(EventlabError::Configuration(_))
        ));
    }
}

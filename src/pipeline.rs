//! End-to-end run: sampling, labeling, features, dataset and importance

use crate::config::AppConfig;
use crate::error::{EventlabError, Result};
use crate::ml::dataset::{FeatureMatrix, LabeledDataset};
use crate::ml::features::{FeatureEngineer, MarketCapabilities, Trade};
use crate::ml::filtering::CusumSampler;
use crate::ml::importance::{FeatureImportance, ImportanceTable};
use crate::ml::labeling::{
    bin_shares, drop_labels, fixed_horizon, BinLabeler, LabelingMethod, TripleBarrierLabeler,
};
use crate::ml::models::BaggedTrees;
use crate::ml::validation::PurgedKFold;
use crate::ml::VolatilityEstimator;
use crate::types::{Bars, EventSet, Label, TimeSeries, Timestamp};

/// Everything one instrument's run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub volatility: TimeSeries,
    pub anchors: Vec<Timestamp>,
    pub events: EventSet,
    pub labels: Vec<Label>,
    pub dataset: LabeledDataset,
    pub train: LabeledDataset,
    pub test: LabeledDataset,
    pub importance: ImportanceTable,
}

/// Importance across instruments and the features picked from it
#[derive(Debug, Clone)]
pub struct PortfolioReport {
    pub instruments: Vec<(String, PipelineOutput)>,
    pub importance: ImportanceTable,
    pub selected: Vec<String>,
}

pub struct Pipeline<'a> {
    config: AppConfig,
    capabilities: Option<&'a dyn MarketCapabilities>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            capabilities: None,
        })
    }

    pub fn with_capabilities(mut self, capabilities: &'a dyn MarketCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Volatility estimate and CUSUM anchors
    pub fn sample(&self, close: &TimeSeries) -> Result<(TimeSeries, Vec<Timestamp>)> {
        let sampling = &self.config.sampling;
        let volatility = VolatilityEstimator::new(sampling.vol_span).estimate(close)?;

        let threshold = match sampling.cusum_threshold {
            Some(h) => h,
            None => volatility.finite_mean().ok_or_else(|| {
                EventlabError::EmptyResult(format!(
                    "No volatility estimate after {} bars with span {}",
                    close.len(),
                    sampling.vol_span
                ))
            })?,
        };

        let anchors = CusumSampler::new(threshold, sampling.cusum_mode)?.sample(close);
        log::info!(
            "Sampled {} events from {} bars (h={:.6})",
            anchors.len(),
            close.len(),
            threshold
        );
        Ok((volatility, anchors))
    }

    /// Resolve horizons, attach the alpha side, bin and prune
    pub fn label(
        &self,
        close: &TimeSeries,
        anchors: &[Timestamp],
        volatility: &TimeSeries,
    ) -> Result<(EventSet, Vec<Label>)> {
        let labeling = &self.config.labeling;

        let events = match labeling.method {
            LabelingMethod::TripleBarrier => {
                TripleBarrierLabeler::new(labeling.barrier.clone())?.label(
                    close,
                    anchors,
                    volatility,
                    None,
                )?
            }
            LabelingMethod::FixedHorizon => fixed_horizon(anchors, labeling.fixed_horizon_window)?,
        };
        let events = labeling.alpha.attach(close, &events)?;

        let mut binner = BinLabeler::new();
        if let Some(hours) = labeling.max_lookup_gap_hours {
            binner = binner.with_max_gap_hours(hours);
        }
        let labels = drop_labels(binner.label(&events, close), labeling.drop_pct);
        if labels.is_empty() {
            return Err(EventlabError::EmptyResult(
                "No labeled event survived binning".to_string(),
            ));
        }

        log::info!(
            "Labeled {} of {} events, bin shares {:?}",
            labels.len(),
            events.len(),
            bin_shares(&labels)
        );
        Ok((events, labels))
    }

    pub fn features(&self, bars: &Bars) -> Result<FeatureMatrix> {
        let mut engineer = FeatureEngineer::new(bars);
        if let Some(capabilities) = self.capabilities {
            engineer = engineer.with_capabilities(capabilities);
        }
        let columns = engineer.engineer(&self.config.features.specs)?;
        log::info!(
            "Engineered {} features ({} distinct computations)",
            columns.len(),
            engineer.cached()
        );
        FeatureMatrix::new(bars.close.index(), columns)
    }

    /// Importance of each feature on the training rows
    pub fn importance(&self, train: &LabeledDataset) -> Result<ImportanceTable> {
        let settings = &self.config.importance;
        let cv = PurgedKFold::new(settings.cv_folds, settings.embargo_pct)?;
        let clf = BaggedTrees::new(settings.bagging.clone());

        FeatureImportance::new(
            settings.importance_method,
            settings.scoring_method,
            cv,
            settings.seed,
        )
        .compute(&clf, &train.spans(), train.x(), &train.y(), train.names())
    }

    pub fn run(&self, bars: &Bars) -> Result<PipelineOutput> {
        let close = &bars.close;
        let (volatility, anchors) = self.sample(close)?;
        if anchors.is_empty() {
            return Err(EventlabError::EmptyResult(
                "CUSUM filter produced no events".to_string(),
            ));
        }
        let (events, labels) = self.label(close, &anchors, &volatility)?;

        let features = self.features(bars)?;
        let settings = &self.config.importance;
        let dataset =
            LabeledDataset::assemble(&features, &labels, settings.start_date, settings.end_date)?;
        let (train, test) = dataset.split(settings.train_fraction)?;
        log::info!(
            "Dataset of {} rows: {} train, {} test",
            dataset.len(),
            train.len(),
            test.len()
        );

        let importance = self.importance(&train)?;

        Ok(PipelineOutput {
            volatility,
            anchors,
            events,
            labels,
            dataset,
            train,
            test,
            importance,
        })
    }

    /// Aggregate raw trades into bars through the injected capabilities, then run
    pub fn run_trades(&self, trades: &[Trade], bar_threshold: f64) -> Result<PipelineOutput> {
        let capabilities = self.capabilities.ok_or_else(|| {
            EventlabError::Configuration(
                "Bar aggregation needs market capabilities, none were supplied".to_string(),
            )
        })?;
        let bars = capabilities.aggregate_bars(trades, bar_threshold)?;
        log::info!("Aggregated {} trades into {} bars", trades.len(), bars.len());
        self.run(&bars)
    }

    /// Run every instrument, join their importances and pick the features
    /// worth keeping
    pub fn run_portfolio(&self, instruments: &[(String, Bars)]) -> Result<PortfolioReport> {
        if instruments.is_empty() {
            return Err(EventlabError::EmptyResult("No instrument to run".to_string()));
        }

        let mut outputs = Vec::with_capacity(instruments.len());
        for (name, bars) in instruments {
            log::info!("Running {}", name);
            outputs.push((name.clone(), self.run(bars)?));
        }

        let tables: Vec<ImportanceTable> =
            outputs.iter().map(|(_, o)| o.importance.clone()).collect();
        let importance = ImportanceTable::join(&tables);
        let columns: Vec<String> = self.config.features.specs.iter().map(|s| s.name()).collect();
        let selected = importance.select(&columns, self.config.importance.importance_method);

        Ok(PortfolioReport {
            instruments: outputs,
            importance,
            selected,
        })
    }
}

use crate::error::{EventlabError, Result};
use crate::ml::validation::LabelSpan;
use crate::types::{Label, TimeSeries, Timestamp};
use std::sync::Arc;

/// Feature columns sharing one bar index
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    names: Vec<String>,
    index: Vec<Timestamp>,
    columns: Vec<Arc<TimeSeries>>,
}

impl FeatureMatrix {
    pub fn new(index: &[Timestamp], columns: Vec<(String, Arc<TimeSeries>)>) -> Result<Self> {
        if let Some((name, _)) = columns.iter().find(|(_, s)| s.index() != index) {
            return Err(EventlabError::Validation(format!(
                "Feature {} is not aligned with the bar index",
                name
            )));
        }
        let (names, columns) = columns.into_iter().unzip();
        Ok(Self {
            names,
            index: index.to_vec(),
            columns,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn column(&self, name: &str) -> Option<&TimeSeries> {
        let pos = self.names.iter().position(|n| n == name)?;
        Some(self.columns[pos].as_ref())
    }

    /// Feature values observed exactly at `ts`
    pub fn row_at(&self, ts: Timestamp) -> Option<Vec<f64>> {
        let pos = self.index.binary_search(&ts).ok()?;
        Some(self.columns.iter().map(|c| c.values()[pos]).collect())
    }
}

/// Labels joined with the features known at each label's anchor
#[derive(Debug, Clone, Default)]
pub struct LabeledDataset {
    names: Vec<String>,
    labels: Vec<Label>,
    x: Vec<Vec<f64>>,
}

impl LabeledDataset {
    /// Align features at `t0`, drop rows with a missing feature or return,
    /// and keep anchors inside the optional `[start, end]` window
    pub fn assemble(
        features: &FeatureMatrix,
        labels: &[Label],
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<Self> {
        let mut labels = labels.to_vec();
        labels.sort_by_key(|l| l.t0);

        let mut kept = Vec::with_capacity(labels.len());
        let mut x = Vec::with_capacity(labels.len());
        let mut incomplete = 0usize;

        for label in labels {
            if start.is_some_and(|s| label.t0 < s) || end.is_some_and(|e| label.t0 > e) {
                continue;
            }
            match features.row_at(label.t0) {
                Some(row) if label.ret.is_finite() && row.iter().all(|v| v.is_finite()) => {
                    x.push(row);
                    kept.push(label);
                }
                _ => incomplete += 1,
            }
        }

        if incomplete > 0 {
            log::debug!("Dropped {} rows with incomplete features", incomplete);
        }
        if kept.is_empty() {
            return Err(EventlabError::EmptyResult(
                "No labeled row has a complete feature set".to_string(),
            ));
        }

        Ok(Self {
            names: features.names().to_vec(),
            labels: kept,
            x,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn x(&self) -> &[Vec<f64>] {
        &self.x
    }

    pub fn y(&self) -> Vec<i8> {
        self.labels.iter().map(|l| l.bin).collect()
    }

    pub fn spans(&self) -> Vec<LabelSpan> {
        self.labels.iter().map(LabelSpan::from).collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Chronological split: the first `train_fraction` of rows for training
    pub fn split(&self, train_fraction: f64) -> Result<(LabeledDataset, LabeledDataset)> {
        let total = self.len();
        let cut = (total as f64 * train_fraction) as usize;
        if cut == 0 || cut >= total {
            return Err(EventlabError::Validation(format!(
                "Invalid split: {} of {} rows in the training set",
                cut, total
            )));
        }

        let part = |range: std::ops::Range<usize>| LabeledDataset {
            names: self.names.clone(),
            labels: self.labels[range.clone()].to_vec(),
            x: self.x[range].to_vec(),
        };
        Ok((part(0..cut), part(cut..total)))
    }

    /// Keep only the named columns, in the given order
    pub fn select(&self, columns: &[String]) -> Result<LabeledDataset> {
        let positions = columns
            .iter()
            .map(|c| {
                self.names.iter().position(|n| n == c).ok_or_else(|| {
                    EventlabError::Validation(format!("Unknown feature column {}", c))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LabeledDataset {
            names: columns.to_vec(),
            labels: self.labels.clone(),
            x: self
                .x
                .iter()
                .map(|row| positions.iter().map(|&p| row[p]).collect())
                .collect(),
        })
    }
}

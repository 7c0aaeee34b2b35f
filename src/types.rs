use crate::error::{EventlabError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Timestamp = DateTime<Utc>;

/// Predicted trade direction used for meta-labeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    /// Positive values map to Long, negative to Short, zero/NaN to nothing
    pub fn from_sign(value: f64) -> Option<Side> {
        if value > 0.0 {
            Some(Side::Long)
        } else if value < 0.0 {
            Some(Side::Short)
        } else {
            None
        }
    }
}

/// Strictly time-ordered numeric series. Missing values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    index: Vec<Timestamp>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(index: Vec<Timestamp>, values: Vec<f64>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(EventlabError::Validation(format!(
                "Index length {} does not match value length {}",
                index.len(),
                values.len()
            )));
        }
        if let Some(pos) = index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(EventlabError::Validation(format!(
                "Timestamps must be strictly increasing (violated at position {})",
                pos + 1
            )));
        }
        Ok(Self { index, values })
    }

    /// Same index, new values
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.index.len() {
            return Err(EventlabError::Validation(format!(
                "Expected {} values, got {}",
                self.index.len(),
                values.len()
            )));
        }
        Ok(Self {
            index: self.index.clone(),
            values,
        })
    }

    /// Same index, values produced by a length-preserving transform
    pub(crate) fn derive(&self, values: Vec<f64>) -> TimeSeries {
        debug_assert_eq!(values.len(), self.index.len());
        Self {
            index: self.index.clone(),
            values,
        }
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<(Timestamp, f64)> {
        Some((*self.index.get(pos)?, *self.values.get(pos)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Exact position of `ts`
    pub fn position_of(&self, ts: Timestamp) -> Option<usize> {
        self.index.binary_search(&ts).ok()
    }

    /// First position whose timestamp is at or after `ts`
    pub fn position_at_or_after(&self, ts: Timestamp) -> Option<usize> {
        let pos = self.index.partition_point(|t| *t < ts);
        (pos < self.index.len()).then_some(pos)
    }

    /// Last position whose timestamp is at or before `ts`
    pub fn position_at_or_before(&self, ts: Timestamp) -> Option<usize> {
        self.index.partition_point(|t| *t <= ts).checked_sub(1)
    }

    /// Backward-filled lookup: the observation at `ts` or the nearest later one
    pub fn value_at_or_after(&self, ts: Timestamp) -> Option<(Timestamp, f64)> {
        self.position_at_or_after(ts).and_then(|pos| self.get(pos))
    }

    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> TimeSeries {
        Self {
            index: self.index.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Mean over the finite values, if any
    pub fn finite_mean(&self) -> Option<f64> {
        let (sum, count) = self
            .values
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// Market bars handed over by the ingestion layer
#[derive(Debug, Clone)]
pub struct Bars {
    pub close: TimeSeries,
    pub volume: Option<Vec<f64>>,
    pub buy_volume: Option<Vec<f64>>,
    pub dollar_volume: Option<Vec<f64>>,
}

impl Bars {
    pub fn from_close(close: TimeSeries) -> Self {
        Self {
            close,
            volume: None,
            buy_volume: None,
            dollar_volume: None,
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

/// A sampled anchor carrying a forward-looking labeling task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub t0: Timestamp,
    pub t1: Option<Timestamp>,
    pub trgt: f64,
    pub side: Option<Side>,
    pub pt: f64,
    pub sl: f64,
}

/// Events keyed by unique anchor, kept in chronological order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSet {
    events: Vec<Event>,
}

impl EventSet {
    pub fn new(mut events: Vec<Event>) -> Result<Self> {
        events.sort_by_key(|e| e.t0);
        if let Some(dup) = events.windows(2).find(|w| w[0].t0 == w[1].t0) {
            return Err(EventlabError::Validation(format!(
                "Duplicate event anchor {}",
                dup[0].t0
            )));
        }
        Ok(Self { events })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Event> {
        self.events.get(pos)
    }

    pub fn find(&self, t0: Timestamp) -> Option<&Event> {
        self.events
            .binary_search_by_key(&t0, |e| e.t0)
            .ok()
            .map(|pos| &self.events[pos])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn anchors(&self) -> Vec<Timestamp> {
        self.events.iter().map(|e| e.t0).collect()
    }

    pub fn into_vec(self) -> Vec<Event> {
        self.events
    }
}

impl<'a> IntoIterator for &'a EventSet {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Realized outcome of one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub t0: Timestamp,
    pub t1: Timestamp,
    pub ret: f64,
    pub bin: i8,
    pub trgt: f64,
    pub side: Option<Side>,
}

/// Importance score of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRecord {
    pub feature: String,
    pub mean: f64,
    pub std: f64,
}

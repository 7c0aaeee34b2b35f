use crate::types::{Label, Timestamp};
use serde::{Deserialize, Serialize};

/// Interval over which an observation's label is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpan {
    pub t0: Timestamp,
    pub t1: Timestamp,
}

impl LabelSpan {
    pub fn new(t0: Timestamp, t1: Timestamp) -> Self {
        Self { t0, t1 }
    }

    /// Closed-interval overlap
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        self.t0 <= end && start <= self.t1
    }
}

impl From<&Label> for LabelSpan {
    fn from(label: &Label) -> Self {
        Self::new(label.t0, label.t1)
    }
}

/// One train/test partition. Every observation lands in exactly one of the
/// four index lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub fold_num: usize,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    /// Removed because their label span overlaps the test span
    pub purged: Vec<usize>,
    /// Removed because they follow the test span too closely
    pub embargoed: Vec<usize>,
    pub test_start: Timestamp,
    pub test_end: Timestamp,
}

use super::types::{Fold, LabelSpan};
use crate::error::Result;

pub trait CrossValidator: Send + Sync {
    /// Split chronologically ordered observations into folds
    fn split(&self, spans: &[LabelSpan]) -> Result<Vec<Fold>>;

    fn n_splits(&self) -> usize;
}

use super::base::CrossValidator;
use super::types::{Fold, LabelSpan};
use crate::error::{EventlabError, Result};

/// K-fold over contiguous chronological blocks that drops training
/// observations whose labels overlap the test span, plus an embargo of
/// `floor(embargo_pct * n)` observations right after the purged region.
#[derive(Debug, Clone, Copy)]
pub struct PurgedKFold {
    n_splits: usize,
    embargo_pct: f64,
}

impl PurgedKFold {
    pub fn new(n_splits: usize, embargo_pct: f64) -> Result<Self> {
        if n_splits < 2 {
            return Err(EventlabError::Configuration(format!(
                "PurgedKFold needs at least 2 splits, got {}",
                n_splits
            )));
        }
        if !(0.0..1.0).contains(&embargo_pct) {
            return Err(EventlabError::Configuration(format!(
                "Embargo share must lie in [0, 1), got {}",
                embargo_pct
            )));
        }
        Ok(Self {
            n_splits,
            embargo_pct,
        })
    }

    pub fn embargo_pct(&self) -> f64 {
        self.embargo_pct
    }

    /// Block boundaries; the first `n % k` blocks hold one extra observation
    fn blocks(&self, n: usize) -> Vec<(usize, usize)> {
        let base = n / self.n_splits;
        let extra = n % self.n_splits;
        let mut start = 0;
        (0..self.n_splits)
            .map(|i| {
                let len = base + usize::from(i < extra);
                let block = (start, start + len);
                start += len;
                block
            })
            .collect()
    }
}

fn check_spans(spans: &[LabelSpan]) -> Result<()> {
    if let Some(pos) = spans.windows(2).position(|w| w[1].t0 < w[0].t0) {
        return Err(EventlabError::Validation(format!(
            "Observations must be sorted by t0 (violated at position {})",
            pos + 1
        )));
    }
    if let Some(pos) = spans.iter().position(|s| s.t1 < s.t0) {
        return Err(EventlabError::Validation(format!(
            "Label span ends before it starts at position {}",
            pos
        )));
    }
    Ok(())
}

impl CrossValidator for PurgedKFold {
    fn split(&self, spans: &[LabelSpan]) -> Result<Vec<Fold>> {
        let n = spans.len();
        if self.n_splits > n {
            return Err(EventlabError::Configuration(format!(
                "Cannot make {} folds from {} observations",
                self.n_splits, n
            )));
        }
        check_spans(spans)?;

        let embargo = (self.embargo_pct * n as f64).floor() as usize;

        let folds = self
            .blocks(n)
            .into_iter()
            .enumerate()
            .map(|(fold_num, (start, end))| {
                let test_start = spans[start].t0;
                let test_end = spans[start..end]
                    .iter()
                    .map(|s| s.t1)
                    .max()
                    .unwrap_or(test_start);

                let mut train = Vec::with_capacity(n);
                let mut purged = Vec::new();

                for (i, span) in spans[..start].iter().enumerate() {
                    if span.t1 < test_start {
                        train.push(i);
                    } else {
                        purged.push(i);
                    }
                }

                let first_right = (end..n).find(|&i| spans[i].t0 > test_end).unwrap_or(n);
                purged.extend(end..first_right);

                let embargo_end = (first_right + embargo).min(n);
                let embargoed: Vec<usize> = (first_right..embargo_end).collect();
                train.extend(embargo_end..n);

                log::debug!(
                    "Fold {}: {} train, {} test, {} purged, {} embargoed",
                    fold_num,
                    train.len(),
                    end - start,
                    purged.len(),
                    embargoed.len()
                );

                Fold {
                    fold_num,
                    train,
                    test: (start..end).collect(),
                    purged,
                    embargoed,
                    test_start,
                    test_end,
                }
            })
            .collect();

        Ok(folds)
    }

    fn n_splits(&self) -> usize {
        self.n_splits
    }
}

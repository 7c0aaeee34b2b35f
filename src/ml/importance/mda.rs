use super::scoring::ScoringMethod;
use super::ImportanceTable;
use crate::error::{EventlabError, Result};
use crate::ml::models::Classifier;
use crate::ml::stats;
use crate::ml::validation::{CrossValidator, Fold, LabelSpan};
use crate::types::ImportanceRecord;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Mean decrease accuracy: out-of-sample score loss after permuting one
/// feature at a time, over purged cross-validation folds.
///
/// Each fold fits its own clone of `clf` and shuffles with seed
/// `seed + fold_num`, so folds run in parallel without changing the result.
pub fn mda<C>(
    clf: &C,
    cv: &dyn CrossValidator,
    spans: &[LabelSpan],
    x: &[Vec<f64>],
    y: &[i8],
    names: &[String],
    scoring: ScoringMethod,
    seed: u64,
) -> Result<ImportanceTable>
where
    C: Classifier + Clone,
{
    if x.len() != spans.len() || y.len() != spans.len() {
        return Err(EventlabError::Validation(format!(
            "Got {} spans, {} rows and {} labels",
            spans.len(),
            x.len(),
            y.len()
        )));
    }

    let folds = cv.split(spans)?;
    let per_fold: Vec<Vec<f64>> = folds
        .par_iter()
        .map(|fold| score_fold(clf, fold, x, y, names.len(), scoring, seed))
        .collect::<Result<_>>()?;

    let scale = (per_fold.len() as f64).powf(-0.5);
    let records = names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = per_fold.iter().map(|f| f[j]).collect();
            ImportanceRecord {
                feature: name.clone(),
                mean: stats::mean(&values),
                std: stats::sample_std(&values) * scale,
            }
        })
        .collect();

    Ok(ImportanceTable::new(records))
}

fn score_fold<C>(
    clf: &C,
    fold: &Fold,
    x: &[Vec<f64>],
    y: &[i8],
    n_features: usize,
    scoring: ScoringMethod,
    seed: u64,
) -> Result<Vec<f64>>
where
    C: Classifier + Clone,
{
    if fold.train.is_empty() {
        return Err(EventlabError::Validation(format!(
            "Fold {} has no training observations left after purging",
            fold.fold_num
        )));
    }

    let gather_x = |rows: &[usize]| rows.iter().map(|&i| x[i].clone()).collect::<Vec<_>>();
    let gather_y = |rows: &[usize]| rows.iter().map(|&i| y[i]).collect::<Vec<_>>();
    let (x0, y0) = (gather_x(&fold.train), gather_y(&fold.train));
    let (x1, y1) = (gather_x(&fold.test), gather_y(&fold.test));

    let mut model = clf.clone();
    model.fit(&x0, &y0, None)?;
    let base = scoring.score(&model, &x1, &y1)?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(fold.fold_num as u64));
    let mut degradation = Vec::with_capacity(n_features);
    for j in 0..n_features {
        let mut column: Vec<f64> = x1.iter().map(|row| row[j]).collect();
        column.shuffle(&mut rng);
        let permuted: Vec<Vec<f64>> = x1
            .iter()
            .zip(&column)
            .map(|(row, v)| {
                let mut row = row.clone();
                row[j] = *v;
                row
            })
            .collect();
        let score = scoring.score(&model, &permuted, &y1)?;
        degradation.push(scoring.degradation(base, score));
    }

    log::debug!(
        "Fold {}: base score {:.4} on {} test rows",
        fold.fold_num,
        base,
        y1.len()
    );
    Ok(degradation)
}

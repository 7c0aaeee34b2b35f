//! Window and exponentially-weighted statistics over NaN-padded series.
//!
//! Every function returns a vector of the same length as its input; positions
//! without enough history hold `f64::NAN`. Windowed and exponentially-weighted
//! statistics run through polars expressions.

use polars::prelude::*;

use crate::error::Result;

/// Simple returns `x[i] / x[i-1] - 1`
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        out[i] = values[i] / values[i - 1] - 1.0;
    }
    out
}

/// First difference `x[i] - x[i-1]`
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        out[i] = values[i] - values[i - 1];
    }
    out
}

/// Carry the last finite value forward over NaN gaps
pub fn forward_fill(values: &[f64]) -> Vec<f64> {
    let mut last = f64::NAN;
    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                last = v;
            }
            last
        })
        .collect()
}

/// Exponentially-weighted mean with adjusted weights, `alpha = 1 / (1 + com)`
pub fn ewm_mean(values: &[f64], com: f64) -> Result<Vec<f64>> {
    let options = EWMOptions {
        alpha: 1.0 / (1.0 + com),
        adjust: true,
        min_periods: 1,
        ignore_nulls: false,
        ..Default::default()
    };
    evaluate(values, |x| x.ewm_mean(options))
}

/// Bias-corrected exponentially-weighted standard deviation,
/// `alpha = 2 / (span + 1)`, undefined until `min_periods` finite values were seen
pub fn ewm_std(values: &[f64], span: usize, min_periods: usize) -> Result<Vec<f64>> {
    let options = EWMOptions {
        alpha: 2.0 / (span as f64 + 1.0),
        adjust: true,
        bias: false,
        min_periods: min_periods.max(2),
        ignore_nulls: false,
        ..Default::default()
    };
    evaluate(values, |x| x.ewm_std(options))
}

fn fixed_window(window: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: window,
        min_periods: window,
        ..Default::default()
    }
}

/// Rolling mean over a full window of finite values
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Ok(vec![f64::NAN; values.len()]);
    }
    evaluate(values, |x| x.rolling_mean(fixed_window(window)))
}

/// Rolling sample standard deviation (ddof = 1)
pub fn rolling_std(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Ok(vec![f64::NAN; values.len()]);
    }
    evaluate(values, |x| x.rolling_std(fixed_window(window)))
}

/// Run one column expression over `values`. Non-finite inputs enter as
/// nulls and null outputs come back as NaN.
fn evaluate<F: FnOnce(Expr) -> Expr>(values: &[f64], expr: F) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Ok(Vec::new());
    }
    let input: Vec<Option<f64>> = values
        .iter()
        .map(|v| v.is_finite().then_some(*v))
        .collect();
    let frame = DataFrame::new(vec![Series::new("x".into(), input).into_column()])?;

    let out = frame
        .lazy()
        .select([expr(col("x")).alias("x")])
        .collect()?;
    let column = out.column("x")?.cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Rolling serial correlation between each window and itself shifted by `lag`
pub fn rolling_autocorr(values: &[f64], window: usize, lag: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if lag == 0 || lag >= window {
        return out;
    }
    for end in window..=values.len() {
        let w = &values[end - window..end];
        if w.iter().all(|v| v.is_finite()) {
            out[end - 1] = pearson(&w[lag..], &w[..w.len() - lag]);
        }
    }
    out
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1), NaN below two observations
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Pearson correlation, NaN when either side has no variance
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return f64::NAN;
    }
    let (ma, mb) = (mean(&a[..n]), mean(&b[..n]));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for i in 0..n {
        let (da, db) = (a[i] - ma, b[i] - mb);
        cov += da * db;
        va += da * da;
        vb += db * db;
    }
    if va <= 0.0 || vb <= 0.0 {
        return f64::NAN;
    }
    cov / (va * vb).sqrt()
}

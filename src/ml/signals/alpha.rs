use super::types::AlphaModel;
use crate::error::{EventlabError, Result};
use crate::ml::stats;
use crate::types::{Event, EventSet, Side, TimeSeries};

impl AlphaModel {
    pub fn validate(&self) -> Result<()> {
        match *self {
            AlphaModel::None => Ok(()),
            AlphaModel::MaCross { fast, slow } => {
                if fast == 0 || slow == 0 {
                    return Err(EventlabError::Configuration(format!(
                        "Moving average windows must be positive, got {}/{}",
                        fast, slow
                    )));
                }
                Ok(())
            }
            AlphaModel::BollingerMeanReverting { window, stdev }
            | AlphaModel::BollingerTrendFollowing { window, stdev } => {
                check_bands(window, stdev)
            }
        }
    }

    /// Side series (+1 / -1, NaN while undefined) or `None` without a model
    pub fn side_series(&self, close: &TimeSeries) -> Result<Option<TimeSeries>> {
        self.validate()?;
        let values = close.values();
        let side = match *self {
            AlphaModel::None => return Ok(None),
            AlphaModel::MaCross { fast, slow } => ma_cross(values, fast, slow)?,
            AlphaModel::BollingerMeanReverting { window, stdev } => {
                bollinger(values, window, stdev, true)?
            }
            AlphaModel::BollingerTrendFollowing { window, stdev } => {
                bollinger(values, window, stdev, false)?
            }
        };
        Ok(Some(close.derive(side)))
    }

    /// Attach the model's side to every event, dropping events whose side is
    /// still undefined at `t0`
    pub fn attach(&self, close: &TimeSeries, events: &EventSet) -> Result<EventSet> {
        let Some(side) = self.side_series(close)? else {
            return Ok(events.clone());
        };

        let sided: Vec<Event> = events
            .iter()
            .filter_map(|event| {
                let value = side.values()[side.position_of(event.t0)?];
                let side = Side::from_sign(value)?;
                Some(Event {
                    side: Some(side),
                    ..event.clone()
                })
            })
            .collect();

        log::debug!(
            "{:?} assigned a side to {} of {} events",
            self,
            sided.len(),
            events.len()
        );
        EventSet::new(sided)
    }
}

fn check_bands(window: usize, stdev: f64) -> Result<()> {
    if window < 2 || !stdev.is_finite() || stdev <= 0.0 {
        return Err(EventlabError::Configuration(format!(
            "Bollinger bands need window >= 2 and a positive width, got {} / {}",
            window, stdev
        )));
    }
    Ok(())
}

pub fn ma_cross(close: &[f64], fast: usize, slow: usize) -> Result<Vec<f64>> {
    let fast_ma = stats::rolling_mean(close, fast)?;
    let slow_ma = stats::rolling_mean(close, slow)?;
    Ok(fast_ma
        .iter()
        .zip(&slow_ma)
        .map(|(f, s)| {
            if f.is_nan() || s.is_nan() {
                f64::NAN
            } else if f >= s {
                1.0
            } else {
                -1.0
            }
        })
        .collect())
}

/// The last band break decides the side until the next break
pub fn bollinger(
    close: &[f64],
    window: usize,
    width: f64,
    mean_reverting: bool,
) -> Result<Vec<f64>> {
    let (above, below) = if mean_reverting { (-1.0, 1.0) } else { (1.0, -1.0) };
    let ma = stats::rolling_mean(close, window)?;
    let sd = stats::rolling_std(close, window)?;

    let raw: Vec<f64> = close
        .iter()
        .zip(ma.iter().zip(&sd))
        .map(|(&c, (&m, &s))| {
            if c > m + width * s {
                above
            } else if c < m - width * s {
                below
            } else {
                f64::NAN
            }
        })
        .collect();

    Ok(stats::forward_fill(&raw))
}

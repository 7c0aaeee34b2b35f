use super::config::{BarrierConfig, BarrierType};
use crate::error::{EventlabError, Result};
use crate::types::{Event, EventSet, Side, TimeSeries, Timestamp};
use chrono::Duration;
use rayon::prelude::*;
use std::ops::Range;

/// Resolution of one event: when and through which barrier it ended
#[derive(Debug, Clone, PartialEq)]
pub struct Touch {
    pub t0: Timestamp,
    pub t1: Option<Timestamp>,
    pub barrier: Option<BarrierType>,
}

/// First observation at or after `t0 + num_days` for each anchor.
/// Anchors whose deadline lies past the end of the series get `None`.
pub fn vertical_barriers(
    close: &TimeSeries,
    anchors: &[Timestamp],
    num_days: f64,
) -> Vec<Option<Timestamp>> {
    let horizon = Duration::milliseconds((num_days * 86_400_000.0).round() as i64);
    anchors
        .iter()
        .map(|t0| {
            close
                .position_at_or_after(*t0 + horizon)
                .map(|pos| close.index()[pos])
        })
        .collect()
}

pub struct TripleBarrierLabeler {
    config: BarrierConfig,
}

impl TripleBarrierLabeler {
    pub fn new(config: BarrierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BarrierConfig {
        &self.config
    }

    /// Build events for the sampled anchors.
    ///
    /// The target of each anchor is the volatility observed exactly at `t0`
    /// times `target_multiplier`. Anchors with an undefined target, or one not
    /// above `min_ret`, are dropped. A side series, when given, is read at `t0`
    /// and anchors without a defined side are dropped as well.
    pub fn events(
        &self,
        close: &TimeSeries,
        anchors: &[Timestamp],
        volatility: &TimeSeries,
        side: Option<&TimeSeries>,
    ) -> Result<EventSet> {
        let vertical = match self.config.num_days {
            Some(days) => vertical_barriers(close, anchors, days),
            None => vec![None; anchors.len()],
        };

        let mut events = Vec::with_capacity(anchors.len());
        let mut dropped = 0usize;

        for (t0, t1) in anchors.iter().copied().zip(vertical) {
            let trgt = volatility
                .position_of(t0)
                .map(|pos| volatility.values()[pos] * self.config.target_multiplier)
                .unwrap_or(f64::NAN);
            if !trgt.is_finite() || trgt <= self.config.min_ret.max(0.0) {
                dropped += 1;
                continue;
            }

            let side = match side {
                Some(series) => {
                    let value = series
                        .position_of(t0)
                        .map(|pos| series.values()[pos])
                        .unwrap_or(f64::NAN);
                    match Side::from_sign(value) {
                        Some(s) => Some(s),
                        None => {
                            dropped += 1;
                            continue;
                        }
                    }
                }
                None => None,
            };

            events.push(Event {
                t0,
                t1,
                trgt,
                side,
                pt: self.config.pt,
                sl: self.config.sl,
            });
        }

        if dropped > 0 {
            log::debug!(
                "Dropped {} of {} anchors without a usable target or side",
                dropped,
                anchors.len()
            );
        }

        EventSet::new(events)
    }

    /// Resolve the first barrier touched by every event, in event order.
    ///
    /// Events are split into contiguous molecules which are scanned on a
    /// dedicated pool of `num_workers` threads; the output does not depend on
    /// the worker count.
    pub fn resolve(&self, close: &TimeSeries, events: &EventSet) -> Result<Vec<Touch>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_workers)
            .build()
            .map_err(|e| EventlabError::Computation(format!("Failed to build worker pool: {}", e)))?;

        let slice = events.as_slice();
        let chunks: Vec<Vec<Touch>> = pool.install(|| {
            molecules(slice.len(), self.config.num_workers)
                .into_par_iter()
                .map(|range| slice[range].iter().map(|e| first_touch(close, e)).collect())
                .collect()
        });

        Ok(chunks.into_iter().flatten().collect())
    }

    /// Sample events and overwrite each `t1` with its earliest touch
    pub fn label(
        &self,
        close: &TimeSeries,
        anchors: &[Timestamp],
        volatility: &TimeSeries,
        side: Option<&TimeSeries>,
    ) -> Result<EventSet> {
        let events = self.events(close, anchors, volatility, side)?;
        if events.is_empty() {
            return Err(EventlabError::EmptyResult(
                "No event survived the target filter".to_string(),
            ));
        }

        let touches = self.resolve(close, &events)?;
        let stats = TouchStats::from_touches(&touches);
        log::info!(
            "Resolved {} events: {} upper, {} lower, {} vertical, {} open",
            touches.len(),
            stats.upper,
            stats.lower,
            stats.vertical,
            stats.open
        );

        let resolved = events
            .into_vec()
            .into_iter()
            .zip(touches)
            .map(|(event, touch)| Event {
                t1: touch.t1,
                ..event
            })
            .collect();
        EventSet::new(resolved)
    }
}

/// Scan the price path of one event for its earliest barrier touch
pub fn first_touch(close: &TimeSeries, event: &Event) -> Touch {
    let vertical = Touch {
        t0: event.t0,
        t1: event.t1,
        barrier: event.t1.map(|_| BarrierType::Vertical),
    };

    let Some(start) = close.position_at_or_after(event.t0) else {
        return vertical;
    };
    let end = match event.t1 {
        Some(t1) => match close.position_at_or_before(t1) {
            Some(end) => end,
            None => return vertical,
        },
        None => close.len() - 1,
    };

    let values = close.values();
    let p0 = values[start];
    let side = event.side.map(Side::sign).unwrap_or(1.0);
    let upper = (event.pt > 0.0).then(|| event.pt * event.trgt);
    let lower = (event.sl > 0.0).then(|| -event.sl * event.trgt);

    for i in start..=end {
        let ret = (values[i] / p0 - 1.0) * side;
        let barrier = if upper.is_some_and(|level| ret > level) {
            Some(BarrierType::Upper)
        } else if lower.is_some_and(|level| ret < level) {
            Some(BarrierType::Lower)
        } else {
            None
        };
        if barrier.is_some() {
            return Touch {
                t0: event.t0,
                t1: Some(close.index()[i]),
                barrier,
            };
        }
    }

    vertical
}

/// Contiguous index ranges, one per worker at most
fn molecules(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let size = len.div_ceil(workers.max(1));
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TouchStats {
    pub upper: usize,
    pub lower: usize,
    pub vertical: usize,
    pub open: usize,
}

impl TouchStats {
    pub fn from_touches(touches: &[Touch]) -> Self {
        let mut stats = Self::default();
        for touch in touches {
            match touch.barrier {
                Some(BarrierType::Upper) => stats.upper += 1,
                Some(BarrierType::Lower) => stats.lower += 1,
                Some(BarrierType::Vertical) => stats.vertical += 1,
                None => stats.open += 1,
            }
        }
        stats
    }
}

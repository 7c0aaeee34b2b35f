use crate::types::{EventSet, Label, Side, TimeSeries, Timestamp};
use chrono::Duration;
use std::collections::BTreeMap;

/// Turns resolved events into classification labels
#[derive(Debug, Clone, Default)]
pub struct BinLabeler {
    max_gap: Option<Duration>,
}

impl BinLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn whenever a backward-filled price lookup lands further than
    /// `hours` away from the requested timestamp
    pub fn with_max_gap_hours(mut self, hours: f64) -> Self {
        self.max_gap = Some(Duration::milliseconds((hours * 3_600_000.0).round() as i64));
        self
    }

    /// One label per event with a horizon.
    ///
    /// Events carrying a side are meta-labeled: the side-adjusted return
    /// decides between 1 (profitable) and 0. Events without a side receive
    /// the sign of the return.
    pub fn label(&self, events: &EventSet, close: &TimeSeries) -> Vec<Label> {
        let mut labels = Vec::with_capacity(events.len());
        let mut open = 0usize;

        for event in events {
            let Some(t1) = event.t1 else {
                open += 1;
                continue;
            };
            let (Some(p0), Some(p1)) = (self.lookup(close, event.t0), self.lookup(close, t1))
            else {
                open += 1;
                continue;
            };

            let mut ret = p1 / p0 - 1.0;
            if let Some(side) = event.side {
                ret *= side.sign();
            }

            labels.push(Label {
                t0: event.t0,
                t1,
                ret,
                bin: bin_for(ret, event.side),
                trgt: event.trgt,
                side: event.side,
            });
        }

        if open > 0 {
            log::debug!("{} events without a resolvable horizon were skipped", open);
        }
        labels
    }

    fn lookup(&self, close: &TimeSeries, ts: Timestamp) -> Option<f64> {
        let (found, value) = close.value_at_or_after(ts)?;
        if let Some(max_gap) = self.max_gap {
            if found - ts > max_gap {
                log::warn!(
                    "Price lookup for {} filled from {} ({} hours later)",
                    ts,
                    found,
                    (found - ts).num_hours()
                );
            }
        }
        Some(value)
    }
}

fn bin_for(ret: f64, side: Option<Side>) -> i8 {
    match side {
        Some(_) => i8::from(ret > 0.0),
        None if ret > 0.0 => 1,
        None if ret < 0.0 => -1,
        None => 0,
    }
}

/// Share of each bin value, keyed in ascending bin order
pub fn bin_shares(labels: &[Label]) -> BTreeMap<i8, f64> {
    let mut counts: BTreeMap<i8, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.bin).or_default() += 1;
    }
    let total = labels.len() as f64;
    counts
        .into_iter()
        .map(|(bin, count)| (bin, count as f64 / total))
        .collect()
}

/// Iteratively remove the rarest bin while its share is at most `min_pct`
/// and at least three bin values remain. Ties go to the smallest bin value.
pub fn drop_labels(mut labels: Vec<Label>, min_pct: f64) -> Vec<Label> {
    loop {
        let shares = bin_shares(&labels);
        if shares.len() < 3 {
            break;
        }
        let Some((rare, share)) = shares
            .iter()
            .fold(None, |acc: Option<(i8, f64)>, (&bin, &share)| match acc {
                Some((_, best)) if best <= share => acc,
                _ => Some((bin, share)),
            })
        else {
            break;
        };
        if share > min_pct {
            break;
        }

        log::info!("Dropped label {} with share {:.4}", rare, share);
        labels.retain(|l| l.bin != rare);
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;
    use chrono::{TimeZone, Utc};

    fn hourly(values: Vec<f64>) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2020, 2, 3, 9, 0, 0).unwrap();
        let index = (0..values.len())
            .map(|i| start + Duration::hours(i as i64))
            .collect();
        TimeSeries::new(index, values).unwrap()
    }

    fn label(bin: i8, i: i64) -> Label {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(i);
        Label {
            t0,
            t1: t0,
            ret: bin as f64,
            bin,
            trgt: 0.01,
            side: None,
        }
    }

    fn events(close: &TimeSeries, spans: &[(usize, Option<usize>)], side: Option<Side>) -> EventSet {
        EventSet::new(
            spans
                .iter()
                .map(|&(a, b)| Event {
                    t0: close.index()[a],
                    t1: b.map(|p| close.index()[p]),
                    trgt: 0.01,
                    side,
                    pt: 1.0,
                    sl: 1.0,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_bins_follow_return_sign() {
        let close = hourly(vec![100.0, 102.0, 99.0, 99.0]);
        let e = events(&close, &[(0, Some(1)), (1, Some(2)), (2, Some(3)), (3, None)], None);
        let labels = BinLabeler::new().label(&e, &close);

        assert_eq!(labels.len(), 3);
        assert_eq!(labels.iter().map(|l| l.bin).collect::<Vec<_>>(), vec![1, -1, 0]);
        assert!((labels[0].ret - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_meta_labels_are_binary() {
        let close = hourly(vec![100.0, 102.0, 99.0]);
        let e = events(&close, &[(0, Some(1)), (1, Some(2))], Some(Side::Short));
        let labels = BinLabeler::new().label(&e, &close);

        assert_eq!(labels[0].bin, 0);
        assert!(labels[0].ret < 0.0);
        assert_eq!(labels[1].bin, 1);
        assert_eq!(labels[1].side, Some(Side::Short));
    }

    #[test]
    fn test_lookup_backfills_across_gap() {
        let start = Utc.with_ymd_and_hms(2020, 2, 3, 9, 0, 0).unwrap();
        let close = TimeSeries::new(
            vec![start, start + Duration::hours(1), start + Duration::hours(30)],
            vec![100.0, 100.0, 110.0],
        )
        .unwrap();
        let e = EventSet::new(vec![Event {
            t0: start,
            t1: Some(start + Duration::hours(5)),
            trgt: 0.01,
            side: None,
            pt: 1.0,
            sl: 1.0,
        }])
        .unwrap();

        let labels = BinLabeler::new().with_max_gap_hours(12.0).label(&e, &close);
        assert!((labels[0].ret - 0.1).abs() < 1e-12);
        assert_eq!(labels[0].bin, 1);
    }

    #[test]
    fn test_drop_labels_removes_single_rare_class() {
        let mut labels = vec![label(-1, 0)];
        labels.extend((1..50).map(|i| label(0, i)));
        labels.extend((50..100).map(|i| label(1, i)));

        let kept = drop_labels(labels, 0.2);
        assert_eq!(kept.len(), 99);
        assert_eq!(bin_shares(&kept).keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_drop_labels_keeps_balanced_classes() {
        let labels: Vec<Label> = (0..30).map(|i| label((i % 3) as i8 - 1, i)).collect();
        assert_eq!(drop_labels(labels, 0.2).len(), 30);
    }

    #[test]
    fn test_drop_labels_breaks_ties_towards_smallest_bin() {
        let mut labels = vec![label(-1, 0), label(0, 1)];
        labels.extend((2..20).map(|i| label(1, i)));
        let kept = drop_labels(labels, 0.2);
        assert_eq!(bin_shares(&kept).keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    }
}

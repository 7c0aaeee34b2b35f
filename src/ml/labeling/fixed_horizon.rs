use crate::error::{EventlabError, Result};
use crate::types::{Event, EventSet, Timestamp};

/// Label horizon ending `window` sampled events later.
///
/// The target is zero; the last `window` anchors have no horizon and are
/// left open, so bin computation skips them.
pub fn fixed_horizon(anchors: &[Timestamp], window: usize) -> Result<EventSet> {
    if window == 0 {
        return Err(EventlabError::Configuration(
            "Fixed horizon window must be at least 1".to_string(),
        ));
    }

    let events = anchors
        .iter()
        .enumerate()
        .map(|(i, &t0)| Event {
            t0,
            t1: anchors.get(i + window).copied(),
            trgt: 0.0,
            side: None,
            pt: 0.0,
            sl: 0.0,
        })
        .collect();

    EventSet::new(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_horizon_shifts_by_window() {
        let start = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
        let anchors: Vec<Timestamp> = (0..5).map(|i| start + Duration::hours(i * 3)).collect();
        let events = fixed_horizon(&anchors, 2).unwrap();

        assert_eq!(events.len(), 5);
        assert_eq!(events.get(0).unwrap().t1, Some(anchors[2]));
        assert_eq!(events.get(2).unwrap().t1, Some(anchors[4]));
        assert_eq!(events.get(3).unwrap().t1, None);
        assert!(events.iter().all(|e| e.trgt == 0.0));
    }

    #[test]
    fn test_zero_window_is_rejected() {
        assert!(fixed_horizon(&[], 0).is_err());
    }
}

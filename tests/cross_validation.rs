use chrono::{Duration, TimeZone, Utc};
use eventlab::ml::validation::{CrossValidator, LabelSpan, PurgedKFold};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Hourly anchors with random label horizons of up to `max_horizon` hours
fn random_spans(n: usize, max_horizon: i64, seed: u64) -> Vec<LabelSpan> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let start = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let t0 = start + Duration::hours(i as i64);
            LabelSpan::new(t0, t0 + Duration::hours(rng.gen_range(0..=max_horizon)))
        })
        .collect()
}

#[test]
fn test_folds_partition_every_observation() {
    let spans = random_spans(203, 12, 1);
    let cv = PurgedKFold::new(5, 0.02).unwrap();
    let folds = cv.split(&spans).unwrap();
    assert_eq!(folds.len(), cv.n_splits());

    let mut tested = vec![0usize; spans.len()];
    for fold in &folds {
        let mut all: Vec<usize> = fold
            .train
            .iter()
            .chain(&fold.test)
            .chain(&fold.purged)
            .chain(&fold.embargoed)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..spans.len()).collect::<Vec<_>>());

        for &i in &fold.test {
            tested[i] += 1;
        }
    }
    // every observation is tested exactly once
    assert!(tested.iter().all(|&c| c == 1));
}

#[test]
fn test_no_training_label_overlaps_the_test_span() {
    let spans = random_spans(150, 20, 2);
    let folds = PurgedKFold::new(4, 0.0).unwrap().split(&spans).unwrap();

    for fold in &folds {
        for &i in &fold.train {
            assert!(
                !spans[i].overlaps(fold.test_start, fold.test_end),
                "fold {} trains on {} which overlaps the test span",
                fold.fold_num,
                i
            );
        }
    }
}

#[test]
fn test_embargo_size_is_a_share_of_observations() {
    let spans = random_spans(100, 3, 3);
    let folds = PurgedKFold::new(4, 0.05).unwrap().split(&spans).unwrap();

    for fold in &folds[..3] {
        assert_eq!(fold.embargoed.len(), 5);
        let last_purged = fold.purged.iter().max().copied().unwrap_or(0);
        assert!(fold.embargoed.iter().all(|&i| i > last_purged));
    }
    assert!(folds[3].embargoed.is_empty());
}

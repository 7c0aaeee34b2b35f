use chrono::{Duration, TimeZone, Utc};
use eventlab::config::AppConfig;
use eventlab::data::{bars_from_frame, importance_to_frame, labels_to_frame};
use eventlab::ml::features::{
    FeatureKind, FeatureSpec, MarketCapabilities, MicrostructureKind, Trade,
};
use eventlab::ml::filtering::CusumMode;
use eventlab::ml::importance::ImportanceMethod;
use eventlab::ml::models::{BaggingConfig, TreeConfig};
use eventlab::types::{Bars, TimeSeries};
use eventlab::{EventlabError, Pipeline};
use polars::df;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const H: f64 = 0.01;

/// Hourly prices oscillating by 0.1% with a 2h jump at step 500, spread
/// over two bars so the move continues after the trigger
fn jump_frame() -> polars::prelude::DataFrame {
    let start = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
    let mut price = 1.0;
    let mut close = vec![price];
    for i in 1..1000 {
        price += match i {
            500 => 1.2 * H,
            501 => 0.8 * H,
            i if i % 2 == 1 => 0.001,
            _ => -0.001,
        };
        close.push(price);
    }
    let timestamps: Vec<i64> = (0..1000)
        .map(|i| (start + Duration::hours(i)).timestamp_millis())
        .collect();
    df! {
        "timestamp" => &timestamps,
        "close" => &close,
    }
    .unwrap()
}

fn jump_config(mode: CusumMode) -> AppConfig {
    let mut config = AppConfig::default();
    config.sampling.vol_span = 100;
    config.sampling.cusum_threshold = Some(H);
    config.sampling.cusum_mode = mode;
    config.labeling.barrier.num_days = Some(1.0);
    config.labeling.barrier.pt = 1.0;
    config.labeling.barrier.sl = 1.0;
    config
}

#[test]
fn test_single_jump_yields_one_positive_label() {
    let bars = bars_from_frame(&jump_frame()).unwrap();
    let pipeline = Pipeline::new(jump_config(CusumMode::Symmetric)).unwrap();

    let (volatility, anchors) = pipeline.sample(&bars.close).unwrap();
    assert_eq!(anchors, vec![bars.close.index()[500]]);

    let (events, labels) = pipeline.label(&bars.close, &anchors, &volatility).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events.get(0).unwrap().t1, Some(bars.close.index()[501]));
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].bin, 1);

    let frame = labels_to_frame(&labels).unwrap();
    assert_eq!(frame.height(), 1);
}

#[test]
fn test_reference_cusum_ignores_upward_jump() {
    let bars = bars_from_frame(&jump_frame()).unwrap();
    let pipeline = Pipeline::new(jump_config(CusumMode::Reference)).unwrap();

    let (_, anchors) = pipeline.sample(&bars.close).unwrap();
    assert!(anchors.is_empty());
    assert!(matches!(
        pipeline.run(&bars),
        Err(EventlabError::EmptyResult(_))
    ));
}

// ===== Full runs =====

fn random_walk(n: usize, seed: u64) -> Bars {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let start = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
    let mut price = 1.0;
    let mut index = Vec::with_capacity(n);
    let mut close = Vec::with_capacity(n);
    for i in 0..n {
        index.push(start + Duration::days(i as i64));
        close.push(price);
        price *= 1.0 + rng.gen_range(-0.01..0.01);
    }
    Bars::from_close(TimeSeries::new(index, close).unwrap())
}

fn walk_config() -> AppConfig {
    let log = FeatureSpec::new(FeatureKind::Log);
    let mut config = AppConfig::default();
    config.sampling.vol_span = 20;
    config.labeling.barrier.num_days = Some(5.0);
    config.labeling.max_lookup_gap_hours = Some(48.0);
    config.features.specs = vec![
        log.clone(),
        FeatureSpec::new(FeatureKind::Stdev { window: 10 }).on(log),
        FeatureSpec::new(FeatureKind::Ffd { d: 0.5, thres: 1e-3 }),
    ];
    config.importance.cv_folds = 3;
    config.importance.bagging = BaggingConfig {
        n_estimators: 10,
        tree: TreeConfig {
            max_features: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    config
}

#[test]
fn test_full_run_on_random_walk() {
    let bars = random_walk(1500, 3);
    let pipeline = Pipeline::new(walk_config()).unwrap();
    let output = pipeline.run(&bars).unwrap();

    assert!(output.labels.len() > 100);
    assert!(output.labels.iter().all(|l| l.bin == 1 || l.bin == -1));
    assert_eq!(
        output.dataset.names(),
        &["log", "stdev_10_of_log", "ffd_0.5"]
    );
    assert_eq!(output.train.len() + output.test.len(), output.dataset.len());
    assert!(output.train.labels().last().unwrap().t0 < output.test.labels()[0].t0);

    assert_eq!(output.importance.len(), 3);
    let frame = importance_to_frame(&output.importance).unwrap();
    assert_eq!(frame.shape(), (3, 3));
}

#[test]
fn test_portfolio_joins_instrument_importances() {
    let mut config = walk_config();
    config.importance.importance_method = ImportanceMethod::Mdi;
    let pipeline = Pipeline::new(config).unwrap();

    let instruments = vec![
        ("a".to_string(), random_walk(1200, 5)),
        ("b".to_string(), random_walk(1200, 6)),
    ];
    let report = pipeline.run_portfolio(&instruments).unwrap();

    assert_eq!(report.instruments.len(), 2);
    assert_eq!(report.importance.len(), 3);
    // MDI keeps what beats the average importance, never everything
    assert!(!report.selected.is_empty());
    assert!(report.selected.len() < 3);
}

// ===== Injected capabilities =====

/// Fixed-count bars and a rolling price-change dispersion as "roll"
struct CountBars;

impl MarketCapabilities for CountBars {
    fn aggregate_bars(&self, trades: &[Trade], threshold: f64) -> eventlab::Result<Bars> {
        let size = threshold as usize;
        let mut index = Vec::new();
        let mut close = Vec::new();
        let mut volume = Vec::new();
        let mut buy_volume = Vec::new();
        for chunk in trades.chunks_exact(size) {
            let last = chunk[size - 1];
            index.push(last.timestamp);
            close.push(last.price);
            volume.push(chunk.iter().map(|t| t.volume).sum());
            buy_volume.push(chunk.iter().filter(|t| t.buy).map(|t| t.volume).sum());
        }
        Ok(Bars {
            close: TimeSeries::new(index, close)?,
            volume: Some(volume),
            buy_volume: Some(buy_volume),
            dollar_volume: None,
        })
    }

    fn microstructure_feature(
        &self,
        _kind: MicrostructureKind,
        bars: &Bars,
        window: usize,
    ) -> eventlab::Result<TimeSeries> {
        let values = bars.close.values();
        let spread = (0..values.len())
            .map(|i| {
                if i < window {
                    return f64::NAN;
                }
                let moves: Vec<f64> = (i + 1 - window..=i)
                    .map(|j| (values[j] - values[j - 1]).abs())
                    .collect();
                moves.iter().sum::<f64>() / window as f64
            })
            .collect();
        bars.close.with_values(spread)
    }
}

fn trades(n: usize) -> Vec<Trade> {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let start = Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap();
    let mut price = 1.0;
    (0..n)
        .map(|i| {
            price *= 1.0 + rng.gen_range(-0.004..0.004);
            Trade {
                timestamp: start + Duration::minutes(i as i64),
                price,
                volume: rng.gen_range(1.0..10.0),
                buy: rng.gen_bool(0.5),
            }
        })
        .collect()
}

#[test]
fn test_run_from_trades_with_capabilities() {
    let mut config = walk_config();
    config.labeling.barrier.num_days = Some(0.25);
    config.features.specs = vec![
        FeatureSpec::new(FeatureKind::Log),
        FeatureSpec::new(FeatureKind::Volratio { com: 10.0 }),
        FeatureSpec::new(FeatureKind::Microstructure {
            measure: MicrostructureKind::Roll,
            window: 20,
        }),
    ];

    let capabilities = CountBars;
    let pipeline = Pipeline::new(config.clone())
        .unwrap()
        .with_capabilities(&capabilities);
    let output = pipeline.run_trades(&trades(8000), 5.0).unwrap();
    assert_eq!(output.dataset.names(), &["log", "volratio_10", "roll_20"]);
    assert_eq!(output.importance.len(), 3);

    let bare = Pipeline::new(config).unwrap();
    assert!(matches!(
        bare.run_trades(&trades(100), 5.0),
        Err(EventlabError::Configuration(_))
    ));
}

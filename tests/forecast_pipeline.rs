/*!
Train a tiny forecaster on fake data
*/
use chartcast::data::fake::ObservationGen;
use chartcast::eval::{horizon_metrics, ClipRange};
use chartcast::features::{window, FeatureBuilder};
use chartcast::lstm::EnergyLSTMDesc;
use chartcast::train::{predict, to_physical, train, TrainConfig};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tch::{nn, Device};

#[test]
fn tiny_forecaster_trains_and_clips() {
    let start = NaiveDate::from_ymd_opt(2023, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let set = ObservationGen::new(StdRng::seed_from_u64(3), start).take_set(300);
    let builder = FeatureBuilder::new(4, 4).unwrap();
    let features = builder.build(&set.records).unwrap();
    let dataset = window(&features, &set.records, 6, 3).unwrap();
    let (mut train_set, mut val_set, mut test_set) = dataset.split(0.7, 0.15);
    assert!(!train_set.is_empty() && !val_set.is_empty() && !test_set.is_empty());

    let (inputs, targets) = train_set.fit_scalers();
    train_set.scale(&inputs, &targets);
    val_set.scale(&inputs, &targets);
    test_set.scale(&inputs, &targets);

    tch::manual_seed(0);
    let mut vs = nn::VarStore::new(Device::Cpu);
    let model = EnergyLSTMDesc {
        features: dataset.features,
        horizons: 3,
        hidden: 8,
        layers: 1,
        dropout: 0.0,
    }
    .build(&vs);
    let config = TrainConfig {
        batch_size: 32,
        max_epochs: 3,
        ..TrainConfig::default()
    };
    let report = train(&model, &mut vs, &train_set, &val_set, &config, &mut StdRng::seed_from_u64(0)).unwrap();
    assert!(report.epochs_run >= 1 && report.epochs_run <= 3);
    assert_eq!(report.val_losses.len(), report.epochs_run);
    assert!(report.best_val_loss.is_finite());

    let predictions = predict(&model, &test_set, 32, Device::Cpu).unwrap();
    assert_eq!(predictions.len(), test_set.len());
    let range = ClipRange::default();
    let predictions = to_physical(&predictions, |v| targets.unscale(v), Some(&range));
    assert!(predictions
        .iter()
        .flatten()
        .all(|p| *p >= range.min() && *p <= range.max()));

    let actual: Vec<Vec<f32>> = test_set.samples.iter().map(|s| s.targets.clone()).collect();
    let actual = to_physical(&actual, |v| targets.unscale(v), None);
    let metrics = horizon_metrics(&predictions, &actual);
    assert_eq!(metrics.len(), 3);
    assert!(metrics.iter().all(|m| m.count == test_set.len() && m.mae.is_finite()));
}

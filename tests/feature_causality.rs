/*!
Test that features and samples never see the future
*/
use chartcast::data::fake::ObservationGen;
use chartcast::data::Observation;
use chartcast::features::{window, FeatureBuilder};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SENTINEL: f64 = 9999.0;

fn records(n: usize) -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2023, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    ObservationGen::new(StdRng::seed_from_u64(11), start)
        .take_set(n)
        .records
}

#[test]
fn future_records_do_not_change_past_features() {
    let builder = FeatureBuilder::new(6, 5).unwrap();
    let mut full = records(120);
    let last = full.len() - 1;
    full[last].power = SENTINEL;
    full[last].weather.iter_mut().for_each(|reading| *reading = SENTINEL);

    let with_future = builder.build(&full).unwrap();
    let without_future = builder.build(&full[..last]).unwrap();
    assert_eq!(with_future.len(), without_future.len() + 1);
    assert_eq!(&with_future[..without_future.len()], &without_future[..]);

    for feature in &with_future[..without_future.len()] {
        assert!(
            feature.values.iter().all(|value| *value != SENTINEL as f32),
            "sentinel leaked into features at {}",
            feature.t
        );
    }
    // The sentinel weather is visible at its own timestep, its power is not
    let current = with_future.last().unwrap();
    let weather = full[last].weather.len();
    assert!(current.values[..weather].iter().all(|value| *value == SENTINEL as f32));
    assert!(current.values[weather..].iter().all(|value| *value != SENTINEL as f32));
}

#[test]
fn samples_target_only_later_power() {
    let builder = FeatureBuilder::new(4, 4).unwrap();
    let records = records(80);
    let features = builder.build(&records).unwrap();
    let dataset = window(&features, &records, 5, 3).unwrap();
    assert!(!dataset.is_empty());
    for sample in &dataset.samples {
        let start = records.iter().position(|record| record.t == sample.t).unwrap();
        let expected: Vec<f32> = records[start..start + 3]
            .iter()
            .map(|record| record.power as f32)
            .collect();
        assert_eq!(sample.targets, expected);
        // Inputs end with the feature vector at the first forecast timestep
        let last_input = &sample.inputs[sample.inputs.len() - dataset.features..];
        let feature = features.iter().find(|feature| feature.t == sample.t).unwrap();
        assert_eq!(last_input, &feature.values[..]);
    }
}

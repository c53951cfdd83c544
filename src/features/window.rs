/*!
Windowing feature vectors into training samples
*/
use super::FeatureVector;
use crate::data::scale::{ColumnScaler, StandardScaler};
use crate::data::Observation;
use crate::error::DataError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A sequence of feature vectors and the power to forecast after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// The timestep of the last feature vector, which is also the first forecast timestep
    pub t: NaiveDateTime,
    /// `sequence_length` feature vectors, concatenated oldest first
    pub inputs: Vec<f32>,
    /// Power at `t` and the `horizons - 1` timesteps after it
    pub targets: Vec<f32>,
}

/// Samples of a fixed shape, in time order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowedDataset {
    /// The number of feature vectors in each sample
    pub sequence_length: usize,
    /// The number of forecast horizons in each sample
    pub horizons: usize,
    /// The length of each feature vector
    pub features: usize,
    /// The samples
    pub samples: Vec<Sample>,
}

/// Window feature vectors into samples of `sequence_length` consecutive vectors, each targeting the power of
/// the `horizons` records starting at its last vector's timestep.
///
/// Samples whose targets run past the end of the records, or include unknown power, are dropped.
pub fn window<F>(
    features: &[FeatureVector],
    records: &[Observation<F>],
    sequence_length: usize,
    horizons: usize,
) -> Result<WindowedDataset, DataError>
where
    F: Copy + Into<f64>,
{
    if sequence_length == 0 {
        return Err(DataError::ZeroWindow("sequence"));
    }
    if horizons == 0 {
        return Err(DataError::ZeroWindow("horizon"));
    }
    let width = features.first().map_or(0, |feature| feature.values.len());
    let mut samples = Vec::new();

    for end in sequence_length.saturating_sub(1)..features.len() {
        let seq = &features[end + 1 - sequence_length..=end];
        let last = &seq[sequence_length - 1];
        if last.index.checked_sub(seq[0].index) != Some(sequence_length - 1) {
            continue;
        }
        let targets = match records.get(last.index..last.index + horizons) {
            Some(targets) => targets,
            None => continue,
        };
        let targets: Vec<f64> = targets.iter().map(|record| Into::<f64>::into(record.power)).collect();
        if targets.iter().any(|target| !target.is_finite()) {
            continue;
        }
        let mut inputs = Vec::with_capacity(sequence_length * width);
        for feature in seq {
            inputs.extend_from_slice(&feature.values);
        }
        samples.push(Sample {
            t: last.t,
            inputs,
            targets: targets.into_iter().map(|target| target as f32).collect(),
        });
    }

    Ok(WindowedDataset {
        sequence_length,
        horizons,
        features: width,
        samples,
    })
}

impl WindowedDataset {
    /// The number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether there are no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn with_samples(&self, samples: Vec<Sample>) -> WindowedDataset {
        WindowedDataset {
            sequence_length: self.sequence_length,
            horizons: self.horizons,
            features: self.features,
            samples,
        }
    }

    /// Split into training, validation and test sets, in time order.
    ///
    /// The last `horizons - 1` samples of the training and validation sets are dropped, so that no target of an
    /// earlier set falls on a timestep forecast by a later set.
    pub fn split(
        &self,
        train_ratio: f64,
        val_ratio: f64,
    ) -> (WindowedDataset, WindowedDataset, WindowedDataset) {
        let n = self.samples.len();
        let train_end = ((n as f64 * train_ratio) as usize).min(n);
        let val_end = (train_end + (n as f64 * val_ratio) as usize).min(n);
        let purge = self.horizons.saturating_sub(1);
        let train = &self.samples[..train_end.saturating_sub(purge)];
        let val = &self.samples[train_end..val_end.saturating_sub(purge).max(train_end)];
        let test = &self.samples[val_end..];
        (
            self.with_samples(train.to_vec()),
            self.with_samples(val.to_vec()),
            self.with_samples(test.to_vec()),
        )
    }

    /// Fit an input scaler and a target scaler to this dataset
    pub fn fit_scalers(&self) -> (StandardScaler<f32>, ColumnScaler<f32>) {
        let rows = self
            .samples
            .iter()
            .flat_map(|sample| sample.inputs.chunks(self.features.max(1)));
        let inputs = StandardScaler::fit(self.features, rows);
        let targets = ColumnScaler::fit(
            self.samples
                .iter()
                .flat_map(|sample| sample.targets.iter().copied()),
        );
        (inputs, targets)
    }

    /// Scale every sample's inputs and targets in place
    pub fn scale(&mut self, inputs: &StandardScaler<f32>, targets: &ColumnScaler<f32>) {
        let features = self.features.max(1);
        for sample in self.samples.iter_mut() {
            for row in sample.inputs.chunks_mut(features) {
                inputs.scale_row(row);
            }
            for target in sample.targets.iter_mut() {
                *target = targets.scale(*target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureBuilder;
    use chrono::{Duration, NaiveDate};

    fn records(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2023, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| Observation {
                t: start + Duration::hours(i as i64),
                power: i as f64,
                weather: vec![1.0, 2.0],
            })
            .collect()
    }

    #[test]
    fn samples_target_the_aligned_timestep_onwards() {
        let recs = records(10);
        let features = FeatureBuilder::new(2, 2).unwrap().build(&recs).unwrap();
        assert_eq!(features.len(), 8);
        let dataset = window(&features, &recs, 3, 2).unwrap();
        // Sequences end at records 4..=8; the one ending at 9 would need power at 10
        assert_eq!(dataset.len(), 5);
        let first = &dataset.samples[0];
        assert_eq!(first.t, recs[4].t);
        assert_eq!(first.targets, vec![4.0, 5.0]);
        assert_eq!(first.inputs.len(), 3 * dataset.features);
        assert_eq!(&first.inputs[..dataset.features], &features[0].values[..]);
    }

    #[test]
    fn unknown_targets_are_dropped() {
        let mut recs = records(10);
        recs[6].power = f64::NAN;
        let features = FeatureBuilder::new(1, 1).unwrap().build(&recs).unwrap();
        let dataset = window(&features, &recs, 1, 2).unwrap();
        assert!(dataset.samples.iter().all(|s| s.targets.iter().all(|t| t.is_finite())));
        assert!(dataset.samples.iter().all(|s| s.t != recs[5].t && s.t != recs[6].t));
    }

    #[test]
    fn chronological_split_with_purge() {
        let recs = records(40);
        let features = FeatureBuilder::new(1, 1).unwrap().build(&recs).unwrap();
        let dataset = window(&features, &recs, 1, 3).unwrap();
        assert_eq!(dataset.len(), 37);
        let (train, val, test) = dataset.split(0.5, 0.25);
        assert_eq!(train.len(), 18 - 2);
        assert_eq!(val.len(), 9 - 2);
        assert_eq!(test.len(), 37 - 27);
        let last_train = train.samples.last().unwrap();
        let first_val = val.samples.first().unwrap();
        assert!(last_train.t + Duration::hours(2) < first_val.t);
    }

    #[test]
    fn scaling_uses_fitted_statistics() {
        let recs = records(12);
        let features = FeatureBuilder::new(1, 1).unwrap().build(&recs).unwrap();
        let mut dataset = window(&features, &recs, 2, 1).unwrap();
        let (inputs, targets) = dataset.fit_scalers();
        assert_eq!(inputs.width(), dataset.features);
        dataset.scale(&inputs, &targets);
        let mean: f32 = dataset.samples.iter().map(|s| s.targets[0]).sum::<f32>() / dataset.len() as f32;
        assert!(mean.abs() < 1e-5);
        // Constant weather columns scale to zero
        assert!(dataset.samples.iter().all(|s| s.inputs[0] == 0.0 && s.inputs[1] == 0.0));
    }
}

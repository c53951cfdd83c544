/*!
Causal feature construction for power forecasting.

The feature vector of timestep `t` only ever looks at records timestamped at or before `t`, and never at the power
produced at `t` itself, which is what is being forecast.
*/
use crate::data::Observation;
use crate::error::DataError;
use crate::util::{cyclical, day_fraction, year_fraction};
use chrono::NaiveDateTime;
use itertools::Itertools;
use num::NumCast;
use serde::{Deserialize, Serialize};
use ta::indicators::{Maximum, Minimum, SimpleMovingAverage, StandardDeviation};
use ta::Next;

pub mod window;

pub use window::{window, Sample, WindowedDataset};

/// The number of rolling statistics of past power in a feature vector: mean, standard deviation, minimum, maximum
pub const ROLLING_FEATURES: usize = 4;

/// The number of time encoding features in a feature vector: sin/cos of the time of day and of the day of year
pub const TIME_FEATURES: usize = 4;

/// The features of one timestep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// The timestep these features describe
    pub t: NaiveDateTime,
    /// The index of the record at this timestep
    pub index: usize,
    /// The feature values
    pub values: Vec<f32>,
}

/// Builds feature vectors out of observation records
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FeatureBuilder {
    lags: usize,
    rolling: usize,
}

/// Rolling statistics over the last `period` values fed in
struct Rolling {
    mean: SimpleMovingAverage,
    std: StandardDeviation,
    min: Minimum,
    max: Maximum,
    current: [f64; ROLLING_FEATURES],
}

impl Rolling {
    fn new(period: usize) -> Result<Rolling, DataError> {
        let invalid = |_| DataError::ZeroWindow("rolling");
        Ok(Rolling {
            mean: SimpleMovingAverage::new(period).map_err(invalid)?,
            std: StandardDeviation::new(period).map_err(invalid)?,
            min: Minimum::new(period).map_err(invalid)?,
            max: Maximum::new(period).map_err(invalid)?,
            current: [0.0; ROLLING_FEATURES],
        })
    }

    fn push(&mut self, value: f64) {
        self.current = [
            self.mean.next(value),
            self.std.next(value),
            self.min.next(value),
            self.max.next(value),
        ];
    }
}

impl FeatureBuilder {
    /// Create a feature builder looking back `lags` records for lagged power, and computing rolling statistics of
    /// power over the last `rolling` records
    pub fn new(lags: usize, rolling: usize) -> Result<FeatureBuilder, DataError> {
        if lags == 0 {
            return Err(DataError::ZeroWindow("lag"));
        }
        if rolling == 0 {
            return Err(DataError::ZeroWindow("rolling"));
        }
        Ok(FeatureBuilder { lags, rolling })
    }

    /// The number of lagged power values
    #[inline]
    pub fn lags(&self) -> usize {
        self.lags
    }

    /// The rolling window size
    #[inline]
    pub fn rolling(&self) -> usize {
        self.rolling
    }

    /// The number of records needed before the first feature vector
    #[inline]
    pub fn warmup(&self) -> usize {
        self.lags.max(self.rolling)
    }

    /// The length of the feature vectors built from records with a given number of weather readings
    #[inline]
    pub fn width(&self, weather: usize) -> usize {
        weather + self.lags + ROLLING_FEATURES + TIME_FEATURES
    }

    /// Build one feature vector per record, from the first record with a full history onwards.
    ///
    /// The vector of record `i` holds, in order: the weather readings at `i`; power at `i - 1` down to
    /// `i - lags`; the mean, standard deviation, minimum and maximum of power over records `i - rolling` to `i - 1`;
    /// and the time of day and day of year of `i`, each encoded as a sin/cos pair. Unknown power is filled forward
    /// from the last known value (or 0 before the first one).
    pub fn build<F>(&self, records: &[Observation<F>]) -> Result<Vec<FeatureVector>, DataError>
    where
        F: Copy + Into<f64> + NumCast,
    {
        let weather = records.first().map_or(0, |record| record.weather.len());
        for record in records {
            if record.weather.len() != weather {
                return Err(DataError::RaggedRecord {
                    t: record.t,
                    found: record.weather.len(),
                    expected: weather,
                });
            }
        }
        if let Some((_, later)) = records.iter().tuple_windows().find(|(a, b)| a.t >= b.t) {
            return Err(DataError::UnorderedRecords(later.t));
        }

        let power = forward_fill(records.iter().map(|record| Into::<f64>::into(record.power)));
        let mut rolling = Rolling::new(self.rolling)?;
        let width = self.width(weather);
        let mut features = Vec::with_capacity(records.len().saturating_sub(self.warmup()));

        for (i, record) in records.iter().enumerate() {
            if i >= self.warmup() {
                let mut values = Vec::with_capacity(width);
                record.push_weather(&mut values);
                values.extend((1..=self.lags).map(|lag| power[i - lag] as f32));
                values.extend(rolling.current.iter().map(|stat| *stat as f32));
                let (day_sin, day_cos) = cyclical(day_fraction(record.t));
                let (year_sin, year_cos) = cyclical(year_fraction(record.t));
                values.extend([day_sin, day_cos, year_sin, year_cos].iter().map(|v| *v as f32));
                debug_assert_eq!(values.len(), width);
                features.push(FeatureVector {
                    t: record.t,
                    index: i,
                    values,
                });
            }
            // Only now does power at `i` become part of the history
            rolling.push(power[i]);
        }
        Ok(features)
    }
}

/// Replace non-finite values with the last finite value before them, or 0 if there is none
pub fn forward_fill<I: IntoIterator<Item = f64>>(values: I) -> Vec<f64> {
    let mut last = 0.0;
    values
        .into_iter()
        .map(|value| {
            if value.is_finite() {
                last = value;
            }
            last
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn records(powers: &[f64]) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2023, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        powers
            .iter()
            .enumerate()
            .map(|(i, power)| Observation {
                t: start + Duration::hours(i as i64),
                power: *power,
                weather: vec![i as f64 * 10.0],
            })
            .collect()
    }

    #[test]
    fn layout_of_feature_vectors() {
        let builder = FeatureBuilder::new(2, 3).unwrap();
        let features = builder.build(&records(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(features.len(), 2);
        let first = &features[0];
        assert_eq!(first.index, 3);
        assert_eq!(first.values.len(), builder.width(1));
        // weather at 3, power at 2 and 1, then rolling stats over powers 1, 2, 3
        assert_eq!(&first.values[..3], &[30.0, 3.0, 2.0]);
        assert_eq!(first.values[3], 2.0);
        assert_eq!(first.values[5], 1.0);
        assert_eq!(first.values[6], 3.0);
        let second = &features[1];
        assert_eq!(&second.values[..3], &[40.0, 4.0, 3.0]);
        assert_eq!(second.values[3], 3.0);
    }

    #[test]
    fn gaps_fill_forward() {
        assert_eq!(
            forward_fill(vec![f64::NAN, 1.0, f64::NAN, f64::INFINITY, 4.0]),
            vec![0.0, 1.0, 1.0, 1.0, 4.0]
        );
    }

    #[test]
    fn zero_windows_are_rejected() {
        assert!(matches!(FeatureBuilder::new(0, 3), Err(DataError::ZeroWindow("lag"))));
        assert!(matches!(FeatureBuilder::new(3, 0), Err(DataError::ZeroWindow("rolling"))));
    }

    #[test]
    fn unordered_records_are_rejected() {
        let mut recs = records(&[1.0, 2.0, 3.0]);
        recs.swap(1, 2);
        let err = FeatureBuilder::new(1, 1).unwrap().build(&recs).unwrap_err();
        assert!(matches!(err, DataError::UnorderedRecords(_)));
    }

    #[test]
    fn too_few_records_build_nothing() {
        let builder = FeatureBuilder::new(4, 4).unwrap();
        assert!(builder.build(&records(&[1.0, 2.0, 3.0])).unwrap().is_empty());
        assert!(builder.build::<f64>(&[]).unwrap().is_empty());
    }
}

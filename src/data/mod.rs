/*!
Observation data: weather readings and the power produced alongside them
*/
use crate::CpuFloat;
use chrono::NaiveDateTime;
use num::NumCast;
use serde::{Deserialize, Serialize};

pub mod fake;
pub mod scale;
pub mod weather;

/// A timestamped weather and power measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<F = CpuFloat> {
    /// This observation's timestamp
    pub t: NaiveDateTime,
    /// The power produced, `NaN` if unknown
    pub power: F,
    /// The weather readings, one per weather column, `NaN` if unknown
    pub weather: Vec<F>,
}

impl<F> Observation<F>
where
    F: Copy + NumCast,
{
    /// Push this observation's weather readings to an input vector. Guaranteed to write `weather.len()` data points
    pub fn push_weather(&self, input: &mut Vec<f32>) {
        input.extend(
            self.weather
                .iter()
                .map(|reading| NumCast::from(*reading).unwrap_or(f32::NAN)),
        );
    }
}

/// A set of observations sharing the same weather columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservationSet<F = CpuFloat> {
    /// The names of the weather columns, in reading order
    pub weather_columns: Vec<String>,
    /// The observations, in time order
    pub records: Vec<Observation<F>>,
}

impl<F> ObservationSet<F> {
    /// The number of observations
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }
    /// Whether there are no observations
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn weather_is_pushed_in_column_order() {
        let t = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let obs = Observation {
            t,
            power: 1200.0,
            weather: vec![650.0, 21.5, f64::NAN],
        };
        let mut input = vec![1.0];
        obs.push_weather(&mut input);
        assert_eq!(input.len(), 4);
        assert_eq!(&input[..3], &[1.0, 650.0, 21.5]);
        assert!(input[3].is_nan());
    }
}

/*!
Generate fake observation data, for testing purposes
*/
use super::{Observation, ObservationSet};
use crate::util::{day_fraction, year_fraction};
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// The weather columns produced by [`ObservationGen`]
pub const FAKE_WEATHER_COLUMNS: [&str; 4] = ["irradiance", "temperature", "wind_speed", "cloud_cover"];

/// Generate hourly solar plant observations: clear sky irradiance shaped by the sun, damped by a random walk of
/// cloud cover, converted to power by a plant of fixed capacity
#[derive(Debug, Clone)]
pub struct ObservationGen<R> {
    /// The RNG in use
    pub rng: R,
    /// The time of the next observation
    pub t: NaiveDateTime,
    /// The time between observations
    pub step: Duration,
    /// The plant's peak output
    pub capacity: f64,
    /// The current cloud cover, in `[0, 1]`
    pub cloud_cover: f64,
    /// The cloud cover random walk's step distribution
    pub cloud_jitter: Normal<f64>,
    /// Measurement noise added to power
    pub power_noise: Normal<f64>,
}

impl<R: Rng> ObservationGen<R> {
    /// Create a generator starting at a given time, with hourly observations and a 5000 unit plant
    pub fn new(rng: R, start: NaiveDateTime) -> ObservationGen<R> {
        ObservationGen {
            rng,
            t: start,
            step: Duration::hours(1),
            capacity: 5000.0,
            cloud_cover: 0.3,
            cloud_jitter: Normal::new(0.0, 0.08).expect("standard deviation is positive"),
            power_noise: Normal::new(0.0, 40.0).expect("standard deviation is positive"),
        }
    }

    /// Collect a number of observations into a set
    pub fn take_set(&mut self, n: usize) -> ObservationSet {
        ObservationSet {
            weather_columns: FAKE_WEATHER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            records: self.by_ref().take(n).collect(),
        }
    }
}

impl<R: Rng> Iterator for ObservationGen<R> {
    type Item = Observation;

    fn next(&mut self) -> Option<Observation> {
        let t = self.t;
        self.t += self.step;

        let day = day_fraction(t);
        let season = (std::f64::consts::TAU * (year_fraction(t) - 0.22)).sin();
        // Sun above the horizon between 06:00 and 18:00, peaking at noon
        let elevation = (std::f64::consts::PI * (day - 0.25) * 2.0).sin().max(0.0);
        let clear_sky = 1000.0 * elevation * (0.75 + 0.25 * season);

        self.cloud_cover = (self.cloud_cover + self.cloud_jitter.sample(&mut self.rng)).clamp(0.0, 1.0);
        let irradiance = clear_sky * (1.0 - 0.75 * self.cloud_cover);
        let temperature = 12.0 + 10.0 * season + 6.0 * elevation + self.rng.gen_range(-1.0..1.0);
        let wind_speed = self.rng.gen_range(0.0..12.0);

        let noise = if irradiance > 0.0 {
            self.power_noise.sample(&mut self.rng)
        } else {
            0.0
        };
        // Panels lose efficiency as they heat up
        let efficiency = 1.0 - 0.004 * (temperature - 25.0).max(0.0);
        let power = (self.capacity * irradiance / 1000.0 * efficiency + noise).clamp(0.0, 5500.0);

        Some(Observation {
            t,
            power,
            weather: vec![irradiance, temperature, wind_speed, self.cloud_cover],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fake_observations_are_plausible() {
        let start = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let set = ObservationGen::new(StdRng::seed_from_u64(7), start).take_set(48);
        assert_eq!(set.len(), 48);
        assert_eq!(set.weather_columns.len(), FAKE_WEATHER_COLUMNS.len());
        for (i, obs) in set.records.iter().enumerate() {
            assert_eq!(obs.t, start + Duration::hours(i as i64));
            assert!((0.0..=5500.0).contains(&obs.power));
            if obs.t.hour() < 6 || obs.t.hour() > 18 {
                assert_eq!(obs.power, 0.0);
            }
        }
        assert!(set.records.iter().any(|obs| obs.power > 0.0));
    }
}

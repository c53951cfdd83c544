/*!
Miscellaneous utilities for `chartcast`
*/

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use num::{Float, NumCast};

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Average number of days in a year, leap years included
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Convert a `chrono::Duration` to a floating point containing the number of nanoseconds
pub fn to_ns<F: Float>(dur: Duration) -> F {
    NumCast::from(dur.num_nanoseconds().unwrap_or(i64::MAX)).unwrap_or_else(F::max_value)
}

/// Convert a `chrono::Duration` to a floating point containing the number of seconds
pub fn to_s<F: Float>(dur: Duration) -> F {
    let ns_in_sec: F = NumCast::from(1_000_000_000).unwrap_or_else(F::one);
    let dur_ns: F = to_ns(dur);
    dur_ns / ns_in_sec
}

/// The fraction of the day elapsed at a given time, in `[0, 1)`
pub fn day_fraction(t: NaiveDateTime) -> f64 {
    let since_midnight = Duration::seconds(t.num_seconds_from_midnight() as i64)
        + Duration::nanoseconds(t.nanosecond() as i64);
    to_s::<f64>(since_midnight) / SECONDS_PER_DAY
}

/// The fraction of the year elapsed at a given time, in `[0, 1)`
pub fn year_fraction(t: NaiveDateTime) -> f64 {
    (t.ordinal0() as f64 + day_fraction(t)) / DAYS_PER_YEAR
}

/// Encode a fraction of a cycle as a point on the unit circle, so that the end of a cycle sits next to its start
pub fn cyclical<F: Float>(fraction: F) -> (F, F) {
    let tau: F = NumCast::from(std::f64::consts::TAU).unwrap_or_else(F::zero);
    let angle = tau * fraction;
    (angle.sin(), angle.cos())
}

/// A date as a (fractional) number of days since the common era
pub fn date_to_days(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// The date nearest to a fractional number of days since the common era, if it is representable
pub fn days_to_date(days: f64) -> Option<NaiveDate> {
    let days = days.round();
    if !days.is_finite() || days < i32::MIN as f64 || days > i32::MAX as f64 {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(days as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_s() {
        assert_eq!(to_s::<f64>(Duration::minutes(1)), 60.0);
        assert_eq!(to_s::<f32>(Duration::days(1)), 60.0 * 60.0 * 24.0);
    }

    #[test]
    fn fractions_of_day_and_year() {
        let noon = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(day_fraction(noon), 0.5);
        assert!((year_fraction(noon) - 0.5 / DAYS_PER_YEAR).abs() < 1e-12);
    }

    #[test]
    fn cyclical_wraps_around() {
        let (s0, c0) = cyclical(0.0f64);
        let (s1, c1) = cyclical(1.0f64);
        assert!((s0 - s1).abs() < 1e-9);
        assert!((c0 - c1).abs() < 1e-9);
        let (s, c) = cyclical(0.25f64);
        assert!((s - 1.0).abs() < 1e-9);
        assert!(c.abs() < 1e-9);
    }

    #[test]
    fn days_round_trip_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(days_to_date(date_to_days(date)), Some(date));
        assert_eq!(days_to_date(date_to_days(date) + 0.4), Some(date));
        assert_eq!(days_to_date(f64::NAN), None);
        assert_eq!(days_to_date(1e12), None);
    }
}

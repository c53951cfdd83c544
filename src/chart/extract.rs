/*!
Calibrating plotted lines into dated series
*/
use super::calibrate::{Axis, Calibration};
use super::series::{Series, SeriesPoint};
use super::ChartDocument;
use crate::error::ExtractError;
use crate::util::{date_to_days, days_to_date};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::debug;

/// Options for series extraction
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ExtractOptions {
    /// Snap every extracted date to the nearest occurrence of this weekday.
    ///
    /// Calibrated dates are only approximate. Weekly data usually falls on a fixed weekday, but which one depends
    /// on the source, so this is never applied unless asked for.
    pub align_weekday: Option<Weekday>,
}

/// The occurrence of a weekday nearest to a date, looking at most three days either way
pub fn align_to_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() as i64 - date.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let shift = if ahead > 3 { ahead - 7 } else { ahead };
    date + Duration::days(shift)
}

/// Extract the dated series plotted in a chart.
///
/// Every plotted line contributes its points. Dates are calibrated against the x axis ticks and rounded to the
/// nearest day, values against the y axis ticks.
pub fn extract(doc: &ChartDocument, options: &ExtractOptions) -> Result<Series, ExtractError> {
    if doc.paths.is_empty() {
        return Err(ExtractError::NoPath);
    }
    let pixels: Vec<_> = doc
        .paths
        .iter()
        .flat_map(|path| path.points.iter().copied())
        .collect();
    if pixels.is_empty() {
        return Err(ExtractError::EmptyPath);
    }

    let dates = Calibration::new(
        Axis::X,
        doc.x_ticks
            .iter()
            .map(|tick| (tick.position, date_to_days(tick.label))),
    )?;
    let values = Calibration::new(
        Axis::Y,
        doc.y_ticks.iter().map(|tick| (tick.position, tick.label)),
    )?;

    let mut points = Vec::with_capacity(pixels.len());
    for pixel in pixels {
        let days = dates.map(pixel.x);
        let mut date = days_to_date(days).ok_or(ExtractError::DateOutOfRange(days))?;
        if let Some(weekday) = options.align_weekday {
            date = align_to_weekday(date, weekday);
        }
        points.push(SeriesPoint {
            date,
            value: values.map(pixel.y),
        });
    }

    let series = Series::from_points(points);
    debug!(
        points = series.len(),
        first = ?series.first().map(|p| p.date),
        last = ?series.last().map(|p| p.date),
        "extracted series"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_alignment() {
        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        // 2024-01-05 is a Friday
        assert_eq!(align_to_weekday(date(5), Weekday::Fri), date(5));
        assert_eq!(align_to_weekday(date(3), Weekday::Fri), date(5));
        assert_eq!(align_to_weekday(date(8), Weekday::Fri), date(5));
        assert_eq!(align_to_weekday(date(9), Weekday::Fri), date(12));
    }
}

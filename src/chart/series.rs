/*!
Extracted date series and their CSV representation
*/
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// A single dated value of an extracted series
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// The calibrated date
    pub date: NaiveDate,
    /// The calibrated value
    pub value: f64,
}

/// A series of dated values, with strictly increasing dates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Build a series from points in any order.
    ///
    /// Points are ordered by date; where several points share a date, only the first one (in the given order) is
    /// kept.
    pub fn from_points(mut points: Vec<SeriesPoint>) -> Series {
        points.sort_by_key(|point| point.date);
        points.dedup_by_key(|point| point.date);
        Series { points }
    }
    /// The points of this series, in date order
    #[inline]
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }
    /// The number of points in this series
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }
    /// Whether this series is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    /// The first point of this series
    #[inline]
    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }
    /// The last point of this series
    #[inline]
    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }
}

#[derive(Debug, Serialize)]
struct OutRow<'a> {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Price")]
    price: f64,
    #[serde(rename = "Commodity")]
    commodity: &'a str,
}

#[derive(Debug, Deserialize)]
struct InRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Price")]
    price: f64,
    #[serde(rename = "Commodity")]
    commodity: String,
}

/// Write labelled series as CSV with a `Date,Price,Commodity` header.
/// On success, return how many rows were written
pub fn write_series<W: Write>(wtr: W, series: &[(String, Series)]) -> Result<usize, csv::Error> {
    let mut wtr = csv::Writer::from_writer(wtr);
    let mut written = 0;
    for (commodity, series) in series {
        for point in series.points() {
            wtr.serialize(OutRow {
                date: point.date,
                price: point.value,
                commodity,
            })?;
            written += 1;
        }
    }
    wtr.flush()?;
    Ok(written)
}

/// Read labelled series written by [`write_series`], in order of each commodity's first appearance
pub fn read_series<R: Read>(rdr: R) -> Result<Vec<(String, Series)>, csv::Error> {
    let mut grouped: Vec<(String, Vec<SeriesPoint>)> = Vec::new();
    for row in csv::Reader::from_reader(rdr).into_deserialize() {
        let row: InRow = row?;
        let point = SeriesPoint {
            date: row.date,
            value: row.price,
        };
        match grouped.iter_mut().find(|(commodity, _)| *commodity == row.commodity) {
            Some((_, points)) => points.push(point),
            None => grouped.push((row.commodity, vec![point])),
        }
    }
    Ok(grouped
        .into_iter()
        .map(|(commodity, points)| (commodity, Series::from_points(points)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(y: i32, m: u32, d: u32, value: f64) -> SeriesPoint {
        SeriesPoint {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            value,
        }
    }

    #[test]
    fn dates_strictly_increase() {
        let series = Series::from_points(vec![
            point(2021, 3, 1, 3.0),
            point(2021, 1, 1, 1.0),
            point(2021, 2, 1, 2.0),
            point(2021, 1, 1, 9.0),
        ]);
        let values: Vec<f64> = series.points().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert!(series.points().windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn csv_layout() {
        let series = vec![
            ("lithium".to_string(), Series::from_points(vec![point(2020, 1, 3, 7.5)])),
            ("lead".to_string(), Series::from_points(vec![point(2020, 1, 3, 2000.0), point(2020, 1, 10, 2010.25)])),
        ];
        let mut out = Vec::new();
        assert_eq!(write_series(&mut out, &series).unwrap(), 3);
        let text = String::from_utf8(out.clone()).unwrap();
        assert_eq!(
            text,
            "Date,Price,Commodity\n2020-01-03,7.5,lithium\n2020-01-03,2000.0,lead\n2020-01-10,2010.25,lead\n"
        );
        assert_eq!(read_series(&out[..]).unwrap(), series);
    }
}

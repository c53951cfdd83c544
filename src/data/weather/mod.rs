/*!
Weather and power CSV reading and writing
*/
use super::{Observation, ObservationSet};
use crate::error::DataError;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::str::FromStr;
use tracing::{debug, warn};

/// The default DateTime format of observation files
pub const DEFAULT_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Fallback formats tried when a timestamp does not match the configured format
const FALLBACK_DATETIMES: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// How an observation file is laid out
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationFormat {
    /// The name of the timestamp column
    pub timestamp_column: String,
    /// The name of the power column, the value being forecast
    pub target_column: String,
    /// The `strftime` format of timestamps
    pub datetime_format: String,
}

impl Default for ObservationFormat {
    fn default() -> ObservationFormat {
        ObservationFormat {
            timestamp_column: "timestamp".into(),
            target_column: "power".into(),
            datetime_format: DEFAULT_DATETIME.into(),
        }
    }
}

/// Parse a timestamp with a given format, falling back to RFC 3339 and a few common layouts
pub fn parse_timestamp(field: &str, format: &str) -> Option<NaiveDateTime> {
    let field = field.trim();
    if let Ok(t) = NaiveDateTime::parse_from_str(field, format) {
        return Some(t);
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(field) {
        return Some(t.naive_utc());
    }
    FALLBACK_DATETIMES
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(field, format).ok())
}

fn reading(field: &str) -> f64 {
    f64::from_str(field.trim()).unwrap_or(f64::NAN)
}

/// Read observations from a Reader.
///
/// Every column other than the timestamp and target columns is taken as a weather reading. Unparseable readings
/// become `NaN`; rows with an unparseable timestamp are skipped. The result is sorted by time.
pub fn read_observations<R: Read>(rdr: R, format: &ObservationFormat) -> Result<ObservationSet, DataError> {
    let mut rdr = csv::Reader::from_reader(rdr);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim() == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    };
    let t_idx = column(&format.timestamp_column)?;
    let power_idx = column(&format.target_column)?;
    let weather_idx: Vec<usize> = (0..headers.len())
        .filter(|i| *i != t_idx && *i != power_idx)
        .collect();

    let mut records = Vec::new();
    let mut skipped = 0;
    for record in rdr.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("");
        let t = match parse_timestamp(field(t_idx), &format.datetime_format) {
            Some(t) => t,
            None => {
                skipped += 1;
                continue;
            }
        };
        records.push(Observation {
            t,
            power: reading(field(power_idx)),
            weather: weather_idx.iter().map(|i| reading(field(*i))).collect(),
        });
    }
    if skipped > 0 {
        warn!("skipped {} rows with unparseable timestamps", skipped);
    }
    records.sort_by_key(|record| record.t);
    debug!(records = records.len(), "read observations");

    Ok(ObservationSet {
        weather_columns: weather_idx.iter().map(|i| headers[*i].trim().to_string()).collect(),
        records,
    })
}

/// Write observations to a Writer, timestamp first, then power, then the weather columns.
/// On success, return how many observations were written
pub fn write_observations<W: Write>(
    wtr: W,
    set: &ObservationSet,
    format: &ObservationFormat,
) -> Result<usize, DataError> {
    let mut wtr = csv::Writer::from_writer(wtr);
    let mut header = vec![format.timestamp_column.clone(), format.target_column.clone()];
    header.extend(set.weather_columns.iter().cloned());
    wtr.write_record(&header)?;
    let mut written = 0;
    for record in &set.records {
        let mut row = vec![
            record.t.format(&format.datetime_format).to_string(),
            record.power.to_string(),
        ];
        row.extend(record.weather.iter().map(|reading| reading.to_string()));
        wtr.write_record(&row)?;
        written += 1;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
timestamp,irradiance,power,temperature
2023-06-01 13:00:00,700,2100.5,22.0
2023-06-01 12:00:00,650,,21.5
not a time,1,2,3
2023-06-01T14:00:00Z,720,2200,n/a
";

    #[test]
    fn reads_and_sorts_observations() {
        let set = read_observations(SAMPLE.as_bytes(), &ObservationFormat::default()).unwrap();
        assert_eq!(set.weather_columns, vec!["irradiance", "temperature"]);
        assert_eq!(set.len(), 3);
        let noon = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(set.records[0].t, noon);
        assert!(set.records[0].power.is_nan());
        assert_eq!(set.records[0].weather, vec![650.0, 21.5]);
        assert_eq!(set.records[1].power, 2100.5);
        assert_eq!(set.records[2].t, noon + chrono::Duration::hours(2));
        assert!(set.records[2].weather[1].is_nan());
    }

    #[test]
    fn missing_target_column() {
        let format = ObservationFormat {
            target_column: "output".into(),
            ..ObservationFormat::default()
        };
        match read_observations(SAMPLE.as_bytes(), &format) {
            Err(DataError::MissingColumn(column)) => assert_eq!(column, "output"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn written_files_read_back() {
        let format = ObservationFormat::default();
        let set = read_observations(SAMPLE.as_bytes(), &format).unwrap();
        let mut out = Vec::new();
        assert_eq!(write_observations(&mut out, &set, &format).unwrap(), 3);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("timestamp,power,irradiance,temperature\n2023-06-01 12:00:00,NaN,650,21.5\n"));
    }
}

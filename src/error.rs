/*!
Error types for the chart and forecasting pipelines
*/
use crate::chart::calibrate::Axis;
use chrono::NaiveDateTime;
use thiserror::Error;

/// An error extracting a series from a chart
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The chart markup is not well formed XML
    #[error("malformed SVG: {0}")]
    Xml(#[from] quick_xml::Error),
    /// An element carries a malformed attribute
    #[error("malformed SVG attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    /// The path data of a plotted line could not be parsed
    #[error("invalid path data: {0}")]
    PathData(String),
    /// No plotted line was found in the chart
    #[error("no plotted path found in chart")]
    NoPath,
    /// Plotted lines were found, but none of them contain points
    #[error("plotted paths contain no points")]
    EmptyPath,
    /// Too few usable tick labels to calibrate an axis
    #[error("not enough {axis} axis ticks to calibrate (found {found}, need at least 2)")]
    NotEnoughTicks {
        /// The axis lacking ticks
        axis: Axis,
        /// The number of usable ticks found
        found: usize,
    },
    /// Tick values do not move in one direction along an axis
    #[error("{axis} axis tick values are not monotone (at pixel {position})")]
    NonMonotoneTicks {
        /// The axis with inconsistent ticks
        axis: Axis,
        /// The position of the first tick breaking the order
        position: f64,
    },
    /// A calibrated date does not fit in a calendar date
    #[error("calibrated date out of range ({0} days from CE)")]
    DateOutOfRange(f64),
}

/// An error reading, validating or transforming observation data
#[derive(Debug, Error)]
pub enum DataError {
    /// CSV input could not be read or written
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// A required column is absent from the input header
    #[error("missing column {0:?}")]
    MissingColumn(String),
    /// A window parameter was zero
    #[error("{0} window must be at least 1")]
    ZeroWindow(&'static str),
    /// Records are not in strictly increasing time order
    #[error("records are not strictly increasing in time at {0}")]
    UnorderedRecords(NaiveDateTime),
    /// A record does not have the same number of readings as the others
    #[error("record at {t} has {found} weather readings, expected {expected}")]
    RaggedRecord {
        /// The record's timestamp
        t: NaiveDateTime,
        /// The number of readings found
        found: usize,
        /// The number of readings expected
        expected: usize,
    },
}

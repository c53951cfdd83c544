/*!
Two small data pipelines written in Rust, as an experiment.

The first turns commodity price charts, saved as SVG from a
[Highcharts](https://www.highcharts.com/)-rendered page, back into dated price series by reading the plotted
path geometry and calibrating it against the axis tick labels.

The second forecasts solar energy production from weather observations with a single layer LSTM, using
PyTorch bindings. Features are built causally from lags, rolling statistics and time of day encodings.
*/
#![forbid(missing_docs)]

pub mod chart;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod features;
pub mod logging;
pub mod lstm;
pub mod source;
pub mod train;
pub mod util;

/// The floating point type to be used for CPU calculations
pub type CpuFloat = f64;

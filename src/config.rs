/*!
Configuration of both pipelines, read from an optional JSON file.

Every field has a default, so a file only needs the fields it changes:

```json
{
    "chart": { "commodities": ["nickel"], "span": "5Y" },
    "forecast": { "horizons": 12, "train": { "patience": 5 } }
}
```
*/
use crate::chart::ChartLayout;
use crate::data::weather::ObservationFormat;
use crate::eval::ClipRange;
use crate::source::Span;
use crate::train::TrainConfig;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// An error loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("reading {}: {source}", .path.display())]
    Io {
        /// The configuration file
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },
    /// The configuration is not valid JSON, or does not match the expected layout
    #[error("parsing configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// A setting is out of range
    #[error("invalid setting {0}")]
    Invalid(String),
}

/// Configuration of the chart scraper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// The commodities to extract
    pub commodities: Vec<String>,
    /// The time span of the charts
    pub span: Span,
    /// Where rendered charts are saved
    pub svg_dir: PathBuf,
    /// The CSV file extracted series are written to
    pub output: PathBuf,
    /// Delete charts once they have been read
    pub cleanup: bool,
    /// Snap extracted dates to this weekday
    pub align_weekday: Option<Weekday>,
    /// The class names identifying chart parts
    pub layout: ChartLayout,
}

impl Default for ChartConfig {
    fn default() -> ChartConfig {
        ChartConfig {
            commodities: vec!["lithium".into(), "lead".into(), "cobalt".into()],
            span: Span::default(),
            svg_dir: PathBuf::from("."),
            output: PathBuf::from("commodity_prices.csv"),
            cleanup: false,
            align_weekday: None,
            layout: ChartLayout::default(),
        }
    }
}

/// Configuration of the power forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// The layout of observation files
    pub format: ObservationFormat,
    /// The number of lagged power values per feature vector
    pub lags: usize,
    /// The rolling statistics window
    pub rolling: usize,
    /// The number of feature vectors per sample
    pub sequence_length: usize,
    /// The number of timesteps forecast per sample
    pub horizons: usize,
    /// The LSTM hidden size
    pub hidden: usize,
    /// The number of stacked LSTM layers
    pub layers: usize,
    /// Dropout between stacked LSTM layers
    pub dropout: f64,
    /// The share of samples used for training
    pub train_ratio: f64,
    /// The share of samples used for validation
    pub val_ratio: f64,
    /// The physically valid range of predictions
    pub clip: ClipRange,
    /// The seed of the random number generators
    pub seed: u64,
    /// Training hyperparameters
    pub train: TrainConfig,
}

impl Default for ForecastConfig {
    fn default() -> ForecastConfig {
        ForecastConfig {
            format: ObservationFormat::default(),
            lags: 24,
            rolling: 24,
            sequence_length: 24,
            horizons: 6,
            hidden: 64,
            layers: 1,
            dropout: 0.0,
            train_ratio: 0.7,
            val_ratio: 0.15,
            clip: ClipRange::default(),
            seed: 42,
            train: TrainConfig::default(),
        }
    }
}

/// Configuration of both pipelines
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chart scraper configuration
    pub chart: ChartConfig,
    /// Power forecaster configuration
    pub forecast: ForecastConfig,
}

impl Config {
    /// Parse configuration from JSON
    pub fn from_json(json: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file, or the defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => {
                let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Config::from_json(&json)
            }
            None => Ok(Config::default()),
        }
    }

    /// Check that every setting is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.forecast;
        let positive = [
            ("forecast.lags", f.lags),
            ("forecast.rolling", f.rolling),
            ("forecast.sequence_length", f.sequence_length),
            ("forecast.horizons", f.horizons),
            ("forecast.hidden", f.hidden),
            ("forecast.layers", f.layers),
            ("forecast.train.batch_size", f.train.batch_size),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{}: must be at least 1", name)));
        }
        if !(0.0..=1.0).contains(&f.dropout) {
            return Err(ConfigError::Invalid(format!("forecast.dropout: {} not in [0, 1]", f.dropout)));
        }
        if !(f.train_ratio > 0.0 && f.val_ratio >= 0.0 && f.train_ratio + f.val_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.train_ratio/val_ratio: {}/{} must be positive and sum to at most 1",
                f.train_ratio, f.val_ratio
            )));
        }
        if !(f.train.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.train.learning_rate: {} must be positive",
                f.train.learning_rate
            )));
        }
        if !(f.train.grad_clip > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.train.grad_clip: {} must be positive",
                f.train.grad_clip
            )));
        }
        if !(f.train.min_delta >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "forecast.train.min_delta: {} must not be negative",
                f.train.min_delta
            )));
        }
        if f.train.max_epochs == 0 {
            return Err(ConfigError::Invalid("forecast.train.max_epochs: must be at least 1".into()));
        }
        if self.chart.commodities.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid("chart.commodities: empty commodity name".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_files_keep_defaults() {
        let config = Config::from_json(
            r#"{
                "chart": { "commodities": ["nickel"], "span": "5Y", "align_weekday": "Fri" },
                "forecast": { "horizons": 12, "clip": [0.0, 6000.0], "train": { "patience": 5 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.chart.commodities, vec!["nickel"]);
        assert_eq!(config.chart.span, Span::FiveYears);
        assert_eq!(config.chart.align_weekday, Some(Weekday::Fri));
        assert_eq!(config.chart.output, PathBuf::from("commodity_prices.csv"));
        assert_eq!(config.forecast.horizons, 12);
        assert_eq!(config.forecast.lags, 24);
        assert_eq!(config.forecast.clip.max(), 6000.0);
        assert_eq!(config.forecast.train.patience, 5);
        assert_eq!(config.forecast.train.batch_size, 64);
    }

    #[test]
    fn out_of_range_settings() {
        assert!(matches!(
            Config::from_json(r#"{ "forecast": { "horizons": 0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "forecast": { "train_ratio": 0.9, "val_ratio": 0.2 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{ "forecast": { "clip": [10.0, 0.0] } }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn training_settings_are_checked() {
        for train in &[
            r#"{ "max_epochs": 0 }"#,
            r#"{ "grad_clip": 0.0 }"#,
            r#"{ "grad_clip": -1.0 }"#,
            r#"{ "min_delta": -0.001 }"#,
        ] {
            let json = format!(r#"{{ "forecast": {{ "train": {} }} }}"#, train);
            assert!(
                matches!(Config::from_json(&json), Err(ConfigError::Invalid(_))),
                "accepted {}",
                train
            );
        }
        assert!(Config::from_json(r#"{ "forecast": { "train": { "min_delta": 0.0, "max_epochs": 1 } } }"#).is_ok());
    }

    #[test]
    fn loads_files() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "chart": {{ "cleanup": true }} }}"#).unwrap();
        assert!(Config::load(Some(file.path())).unwrap().chart.cleanup);
        assert!(matches!(
            Config::load(Some(Path::new("/nonexistent/chartcast.json"))),
            Err(ConfigError::Io { .. })
        ));
    }
}

/*!
Where chart markup comes from.

Charts are rendered by a browser, which saves them as SVG files into a download directory. This module only deals
with picking those files up: driving the browser itself happens outside of this crate.
*/
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, warn};

/// The time span a chart covers
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Span {
    /// One year
    #[serde(rename = "1Y")]
    OneYear,
    /// Five years
    #[serde(rename = "5Y")]
    FiveYears,
    /// Ten years
    #[serde(rename = "10Y")]
    TenYears,
    /// Twenty five years
    #[serde(rename = "25Y")]
    TwentyFiveYears,
    /// All available history
    #[serde(rename = "MAX")]
    Max,
}

impl Default for Span {
    fn default() -> Span {
        Span::TenYears
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Span::OneYear => "1Y",
            Span::FiveYears => "5Y",
            Span::TenYears => "10Y",
            Span::TwentyFiveYears => "25Y",
            Span::Max => "MAX",
        };
        f.write_str(s)
    }
}

impl FromStr for Span {
    type Err = SourceError;
    fn from_str(s: &str) -> Result<Span, SourceError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1Y" => Ok(Span::OneYear),
            "5Y" => Ok(Span::FiveYears),
            "10Y" => Ok(Span::TenYears),
            "25Y" => Ok(Span::TwentyFiveYears),
            "MAX" => Ok(Span::Max),
            _ => Err(SourceError::InvalidSpan(s.to_string())),
        }
    }
}

/// A request for the chart of a commodity
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ChartRequest {
    /// The commodity to chart, e.g. `lithium`
    pub commodity: String,
    /// The time span to chart
    pub span: Span,
}

/// An error obtaining chart markup
#[derive(Debug, Error)]
pub enum SourceError {
    /// No chart is available for a request
    #[error("no chart found for {commodity} ({span}) in {}", .dir.display())]
    NotFound {
        /// The requested commodity
        commodity: String,
        /// The requested span
        span: Span,
        /// Where the chart was looked for
        dir: PathBuf,
    },
    /// A span could not be parsed
    #[error("invalid span {0:?}, expected one of 1Y, 5Y, 10Y, 25Y, MAX")]
    InvalidSpan(String),
    /// Reading a chart failed
    #[error("reading {}: {source}", .path.display())]
    Io {
        /// The file being read
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },
}

/// A provider of rendered chart markup
pub trait ChartSource {
    /// Produce the raw SVG markup of a chart
    fn fetch(&mut self, request: &ChartRequest) -> Result<String, SourceError>;
}

/// Charts saved as SVG files in a directory
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DirectorySource {
    /// The directory holding the charts
    pub dir: PathBuf,
    /// Delete each chart file once it has been read
    pub cleanup: bool,
}

impl DirectorySource {
    /// Create a new source reading from a directory, leaving files in place
    pub fn new<P: Into<PathBuf>>(dir: P) -> DirectorySource {
        DirectorySource {
            dir: dir.into(),
            cleanup: false,
        }
    }

    /// The file a request resolves to: `<commodity>_<span>.svg` if present, otherwise `<commodity>.svg`
    pub fn locate(&self, request: &ChartRequest) -> Option<PathBuf> {
        let candidates = [
            format!("{}_{}.svg", request.commodity, request.span),
            format!("{}.svg", request.commodity),
        ];
        candidates
            .iter()
            .map(|name| self.dir.join(name))
            .find(|path| path.is_file())
    }
}

impl ChartSource for DirectorySource {
    fn fetch(&mut self, request: &ChartRequest) -> Result<String, SourceError> {
        let path = self.locate(request).ok_or_else(|| SourceError::NotFound {
            commodity: request.commodity.clone(),
            span: request.span,
            dir: self.dir.clone(),
        })?;
        debug!(path = %path.display(), "reading chart");
        let markup = fs::read_to_string(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        if self.cleanup {
            if let Err(err) = fs::remove_file(&path) {
                warn!(path = %path.display(), "failed to delete chart file: {}", err);
            }
        }
        Ok(markup)
    }
}

/// A single SVG file, returned whatever the request
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FileSource(pub PathBuf);

impl ChartSource for FileSource {
    fn fetch(&mut self, _request: &ChartRequest) -> Result<String, SourceError> {
        fs::read_to_string(&self.0).map_err(|source| SourceError::Io {
            path: self.0.clone(),
            source,
        })
    }
}

/// The most recently modified `.svg` file in a directory.
///
/// When `after` is given, a newest file older than it is not returned: this tells a fresh download apart from
/// stale files.
pub fn latest_svg(dir: &Path, after: Option<SystemTime>) -> io::Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("svg") || !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(match (newest, after) {
        (Some((modified, _)), Some(after)) if modified < after => None,
        (newest, _) => newest.map(|(_, path)| path),
    })
}

/// The most recently modified `.svg` file in a directory, if it was saved within `max_age` of now
pub fn recent_svg(dir: &Path, max_age: Option<Duration>) -> io::Result<Option<PathBuf>> {
    let after = max_age.and_then(|age| SystemTime::now().checked_sub(age));
    latest_svg(dir, after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(commodity: &str) -> ChartRequest {
        ChartRequest {
            commodity: commodity.into(),
            span: Span::TenYears,
        }
    }

    #[test]
    fn spans_parse() {
        assert_eq!("10y".parse::<Span>().unwrap(), Span::TenYears);
        assert_eq!(" max ".parse::<Span>().unwrap(), Span::Max);
        assert_eq!(Span::FiveYears.to_string(), "5Y");
        assert!("3Y".parse::<Span>().is_err());
    }

    #[test]
    fn directory_source_prefers_span_specific_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lead.svg"), "<svg>plain</svg>").unwrap();
        fs::write(dir.path().join("lead_10Y.svg"), "<svg>ten</svg>").unwrap();
        fs::write(dir.path().join("cobalt.svg"), "<svg>cobalt</svg>").unwrap();
        let mut source = DirectorySource::new(dir.path());
        assert_eq!(source.fetch(&request("lead")).unwrap(), "<svg>ten</svg>");
        assert_eq!(source.fetch(&request("cobalt")).unwrap(), "<svg>cobalt</svg>");
        assert!(matches!(
            source.fetch(&request("nickel")),
            Err(SourceError::NotFound { .. })
        ));
    }

    #[test]
    fn directory_source_cleanup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lithium.svg");
        fs::write(&path, "<svg/>").unwrap();
        let mut source = DirectorySource {
            dir: dir.path().into(),
            cleanup: true,
        };
        assert_eq!(source.fetch(&request("lithium")).unwrap(), "<svg/>");
        assert!(!path.exists());
    }

    #[test]
    fn latest_svg_detects_fresh_downloads() {
        let dir = tempdir().unwrap();
        assert_eq!(latest_svg(dir.path(), None).unwrap(), None);
        fs::write(dir.path().join("notes.txt"), "not a chart").unwrap();
        fs::write(dir.path().join("chart.svg"), "<svg/>").unwrap();
        assert_eq!(
            latest_svg(dir.path(), None).unwrap(),
            Some(dir.path().join("chart.svg"))
        );
        let later = SystemTime::now() + Duration::from_secs(3600);
        assert_eq!(latest_svg(dir.path(), Some(later)).unwrap(), None);
    }

    #[test]
    fn recent_svg_ignores_stale_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        fs::write(&path, "<svg/>").unwrap();
        assert_eq!(recent_svg(dir.path(), Some(Duration::from_secs(3600))).unwrap(), Some(path.clone()));
        assert_eq!(recent_svg(dir.path(), None).unwrap(), Some(path));
        assert_eq!(recent_svg(dir.path(), Some(Duration::from_secs(0))).unwrap(), None);
    }
}

/*!
Chart documents: the plotted lines and axis ticks of a rendered SVG chart
*/
use crate::error::ExtractError;
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub mod calibrate;
pub mod extract;
pub mod path;
pub mod series;

pub use extract::{extract, ExtractOptions};
pub use path::Point;
pub use series::{Series, SeriesPoint};

use calibrate::Axis;
use path::{parse_path_data, parse_translate};

/// Class names identifying the parts of a chart
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartLayout {
    /// Class of the `path` elements tracing plotted lines
    pub graph_class: String,
    /// Class of the group holding the series to extract. Empty to take every plotted line
    pub series_class: String,
    /// Class of the group holding the x axis labels
    pub x_labels_class: String,
    /// Class of the group holding the y axis labels
    pub y_labels_class: String,
    /// Paths and labels inside a group carrying any of these classes are ignored
    pub excluded_classes: Vec<String>,
}

impl Default for ChartLayout {
    fn default() -> ChartLayout {
        ChartLayout {
            graph_class: "highcharts-graph".into(),
            series_class: "highcharts-series-0".into(),
            x_labels_class: "highcharts-xaxis-labels".into(),
            y_labels_class: "highcharts-yaxis-labels".into(),
            excluded_classes: vec![
                "highcharts-navigator".into(),
                "highcharts-navigator-series".into(),
                "highcharts-navigator-xaxis".into(),
                "highcharts-navigator-yaxis".into(),
            ],
        }
    }
}

/// A labelled tick on an axis, positioned in absolute pixel space
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTick<T> {
    /// The tick's pixel position along its axis
    pub position: f64,
    /// The tick's label
    pub label: T,
}

/// A plotted line, in absolute pixel space
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotPath {
    /// The path's segment end points, in drawing order
    pub points: Vec<Point>,
}

/// A chart parsed out of SVG markup
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDocument {
    /// The raw markup the chart was parsed from
    pub markup: String,
    /// Every plotted line found
    pub paths: Vec<PlotPath>,
    /// The dated ticks of the x axis, in document order
    pub x_ticks: Vec<AxisTick<NaiveDate>>,
    /// The valued ticks of the y axis, in document order
    pub y_ticks: Vec<AxisTick<f64>>,
}

/// An open element, with the translation accumulated from its ancestors and itself
#[derive(Debug)]
struct Frame {
    name: String,
    classes: Vec<String>,
    offset: Point,
}

impl Frame {
    fn open(e: &BytesStart, parent: Option<&Frame>) -> Result<Frame, ExtractError> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
        let classes = attribute(e, "class")?
            .map(|class| class.split_whitespace().map(String::from).collect())
            .unwrap_or_default();
        let own = attribute(e, "transform")?
            .map(|transform| parse_translate(&transform))
            .unwrap_or_default();
        let offset = parent.map(|parent| parent.offset).unwrap_or_default().translate(own);
        Ok(Frame {
            name,
            classes,
            offset,
        })
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Whether an element or one of its ancestors carries a class
fn in_group(frame: &Frame, ancestors: &[Frame], class: &str) -> bool {
    frame.has_class(class) || ancestors.iter().any(|ancestor| ancestor.has_class(class))
}

fn is_excluded(frame: &Frame, ancestors: &[Frame], layout: &ChartLayout) -> bool {
    layout
        .excluded_classes
        .iter()
        .any(|class| in_group(frame, ancestors, class))
}

/// A tick label whose text is still being read
#[derive(Debug)]
struct PendingLabel {
    axis: Axis,
    position: f64,
    depth: usize,
    text: String,
}

fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>, ExtractError> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Parse the first number of a (possibly list valued) coordinate attribute
fn coordinate(value: &str) -> Option<f64> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .find(|part| !part.is_empty())?
        .parse()
        .ok()
}

/// Parse an x axis label as a date.
///
/// Full dates map to themselves, month labels to the first of the month and bare years to January 1st.
pub fn parse_date_label(label: &str) -> Option<NaiveDate> {
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    for format in &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&label, format) {
            return Some(date);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("1 {}", label), "%d %b %Y") {
        return Some(date);
    }
    if label.len() == 4 && label.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::from_ymd_opt(label.parse().ok()?, 1, 1);
    }
    None
}

/// Parse a y axis label as a number, ignoring thousands separators
pub fn parse_value_label(label: &str) -> Option<f64> {
    let cleaned: String = label
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok().filter(|value: &f64| value.is_finite())
}

impl ChartDocument {
    /// Parse a chart out of SVG markup.
    ///
    /// Plotted lines are the `path` elements carrying the layout's graph class; ticks are the `text` elements
    /// inside the groups carrying the layout's axis label classes. Labels which do not parse are skipped, as are
    /// y labels repeating an earlier position. Every `translate` on an element or its ancestors is applied.
    pub fn parse(markup: &str, layout: &ChartLayout) -> Result<ChartDocument, ExtractError> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Frame> = Vec::new();
        let mut paths = Vec::new();
        let mut x_ticks = Vec::new();
        let mut y_ticks: Vec<AxisTick<f64>> = Vec::new();
        let mut pending: Option<PendingLabel> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let frame = Frame::open(&e, stack.last())?;
                    if let Some(path) = Self::visit_path(&e, &frame, &stack, layout)? {
                        paths.push(path);
                    }
                    if pending.is_none() && frame.name == "text" {
                        pending = Self::visit_label(&e, &frame, &stack, layout)?;
                    }
                    stack.push(frame);
                }
                Event::Empty(e) => {
                    let frame = Frame::open(&e, stack.last())?;
                    if let Some(path) = Self::visit_path(&e, &frame, &stack, layout)? {
                        paths.push(path);
                    }
                }
                Event::Text(e) => {
                    if let Some(label) = pending.as_mut() {
                        label.text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(label) = pending.as_mut() {
                        label.text.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(_) => {
                    stack.pop();
                    if pending.as_ref().map_or(false, |label| label.depth == stack.len()) {
                        if let Some(label) = pending.take() {
                            Self::finish_label(label, &mut x_ticks, &mut y_ticks);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        debug!(
            paths = paths.len(),
            x_ticks = x_ticks.len(),
            y_ticks = y_ticks.len(),
            "parsed chart document"
        );
        Ok(ChartDocument {
            markup: markup.to_string(),
            paths,
            x_ticks,
            y_ticks,
        })
    }

    fn visit_path(
        e: &BytesStart,
        frame: &Frame,
        ancestors: &[Frame],
        layout: &ChartLayout,
    ) -> Result<Option<PlotPath>, ExtractError> {
        if frame.name != "path" || !frame.has_class(&layout.graph_class) {
            return Ok(None);
        }
        let selected = layout.series_class.is_empty() || in_group(frame, ancestors, &layout.series_class);
        if !selected || is_excluded(frame, ancestors, layout) {
            trace!("skipping plotted line outside the selected series");
            return Ok(None);
        }
        let d = attribute(e, "d")?.unwrap_or_default();
        let points = parse_path_data(&d)?
            .into_iter()
            .map(|point| point.translate(frame.offset))
            .collect();
        Ok(Some(PlotPath { points }))
    }

    fn visit_label(
        e: &BytesStart,
        frame: &Frame,
        ancestors: &[Frame],
        layout: &ChartLayout,
    ) -> Result<Option<PendingLabel>, ExtractError> {
        if is_excluded(frame, ancestors, layout) {
            return Ok(None);
        }
        let (axis, attr, offset) = if in_group(frame, ancestors, &layout.x_labels_class) {
            (Axis::X, "x", frame.offset.x)
        } else if in_group(frame, ancestors, &layout.y_labels_class) {
            (Axis::Y, "y", frame.offset.y)
        } else {
            return Ok(None);
        };
        let position = match attribute(e, attr)?.as_deref().and_then(coordinate) {
            Some(position) => position + offset,
            None => {
                trace!(%axis, "skipping tick label without a position");
                return Ok(None);
            }
        };
        Ok(Some(PendingLabel {
            axis,
            position,
            depth: ancestors.len(),
            text: String::new(),
        }))
    }

    fn finish_label(
        label: PendingLabel,
        x_ticks: &mut Vec<AxisTick<NaiveDate>>,
        y_ticks: &mut Vec<AxisTick<f64>>,
    ) {
        match label.axis {
            Axis::X => match parse_date_label(&label.text) {
                Some(date) => x_ticks.push(AxisTick {
                    position: label.position,
                    label: date,
                }),
                None => trace!(text = %label.text.trim(), "skipping unparseable x label"),
            },
            Axis::Y => {
                if y_ticks.iter().any(|tick| tick.position == label.position) {
                    return;
                }
                match parse_value_label(&label.text) {
                    Some(value) => y_ticks.push(AxisTick {
                        position: label.position,
                        label: value,
                    }),
                    None => trace!(text = %label.text.trim(), "skipping unparseable y label"),
                }
            }
        }
    }
}

/*!
SVG path data and transform parsing
*/
use crate::error::ExtractError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A point in pixel space
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal pixel coordinate, growing rightwards
    pub x: f64,
    /// Vertical pixel coordinate, growing downwards
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[inline]
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
    /// This point shifted by an offset
    #[inline]
    pub fn translate(self, by: Point) -> Point {
        Point::new(self.x + by.x, self.y + by.y)
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"([MmLlHhVvCcSsQqTtAaZz])|([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)")
            .expect("path token regex is valid")
    })
}

fn translate_regex() -> &'static Regex {
    static TRANSLATE: OnceLock<Regex> = OnceLock::new();
    TRANSLATE.get_or_init(|| Regex::new(r"translate\s*\(([^)]*)\)").expect("translate regex is valid"))
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Token {
    Command(char),
    Number(f64),
}

fn tokenize(d: &str) -> Result<Vec<Token>, ExtractError> {
    let mut tokens = Vec::new();
    let mut last_end = 0;
    for caps in token_regex().captures_iter(d) {
        let whole = caps.get(0).expect("capture group 0 always matches");
        let gap = &d[last_end..whole.start()];
        if let Some(bad) = gap.chars().find(|c| !c.is_whitespace() && *c != ',') {
            return Err(ExtractError::PathData(format!(
                "unexpected {:?} at offset {}",
                bad, last_end
            )));
        }
        last_end = whole.end();
        if let Some(command) = caps.get(1) {
            tokens.push(Token::Command(command.as_str().chars().next().unwrap_or('Z')));
        } else if let Some(number) = caps.get(2) {
            let value = number
                .as_str()
                .parse()
                .map_err(|_| ExtractError::PathData(format!("bad number {:?}", number.as_str())))?;
            tokens.push(Token::Number(value));
        }
    }
    let rest = &d[last_end..];
    if let Some(bad) = rest.chars().find(|c| !c.is_whitespace() && *c != ',') {
        return Err(ExtractError::PathData(format!(
            "unexpected {:?} at offset {}",
            bad, last_end
        )));
    }
    Ok(tokens)
}

/// The number of parameters taken by a path command
fn arity(command: char) -> usize {
    match command.to_ascii_uppercase() {
        'M' | 'L' | 'T' => 2,
        'H' | 'V' => 1,
        'S' | 'Q' => 4,
        'C' => 6,
        'A' => 7,
        _ => 0,
    }
}

/// Parse the `d` attribute of an SVG path into the absolute end points of its segments.
///
/// Every command (including curves and arcs) contributes the point its segment ends at; control points are not
/// returned, since charts place data points on segment boundaries. `Z` moves the pen back to the start of the
/// current subpath without emitting a point.
pub fn parse_path_data(d: &str) -> Result<Vec<Point>, ExtractError> {
    let tokens = tokenize(d)?;
    let mut points = Vec::new();
    let mut pen = Point::default();
    let mut subpath_start = Point::default();
    let mut command: Option<char> = None;
    let mut i = 0;

    while i < tokens.len() {
        let current = match tokens[i] {
            Token::Command(c) => {
                i += 1;
                c
            }
            Token::Number(_) => match command {
                // Extra coordinate pairs after a moveto are implicit linetos
                Some('M') => 'L',
                Some('m') => 'l',
                Some(c) if arity(c) > 0 => c,
                _ => {
                    return Err(ExtractError::PathData(
                        "coordinates without a preceding command".into(),
                    ))
                }
            },
        };
        if command.is_none() && !matches!(current, 'M' | 'm') {
            return Err(ExtractError::PathData(format!(
                "path must start with a moveto, found {:?}",
                current
            )));
        }
        command = Some(current);

        let n = arity(current);
        if n == 0 {
            pen = subpath_start;
            continue;
        }
        let mut args = [0.0f64; 7];
        for arg in args.iter_mut().take(n) {
            match tokens.get(i) {
                Some(Token::Number(value)) => *arg = *value,
                _ => {
                    return Err(ExtractError::PathData(format!(
                        "command {:?} expects {} parameters",
                        current, n
                    )))
                }
            }
            i += 1;
        }

        let relative = current.is_ascii_lowercase();
        let base = if relative { pen } else { Point::default() };
        let end = match current.to_ascii_uppercase() {
            'H' => Point::new(base.x + args[0], pen.y),
            'V' => Point::new(pen.x, base.y + args[0]),
            _ => Point::new(base.x + args[n - 2], base.y + args[n - 1]),
        };
        if current.to_ascii_uppercase() == 'M' {
            subpath_start = end;
        }
        pen = end;
        points.push(end);
    }
    Ok(points)
}

/// Sum every `translate(tx[, ty])` in an SVG transform attribute.
///
/// Other transform functions are ignored.
pub fn parse_translate(transform: &str) -> Point {
    let mut offset = Point::default();
    for caps in translate_regex().captures_iter(transform) {
        let mut args = caps[1]
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|arg| !arg.is_empty())
            .map(|arg| arg.parse::<f64>().unwrap_or(0.0));
        offset.x += args.next().unwrap_or(0.0);
        offset.y += args.next().unwrap_or(0.0);
    }
    offset
}

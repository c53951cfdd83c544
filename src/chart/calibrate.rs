/*!
Pixel to data space calibration from axis ticks
*/
use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A chart axis
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// The horizontal (date) axis
    X,
    /// The vertical (value) axis
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// A piecewise linear map from pixel positions along an axis to data values
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    axis: Axis,
    anchors: Vec<(f64, f64)>,
}

impl Calibration {
    /// Build a calibration from `(pixel position, data value)` anchors.
    ///
    /// Anchors are sorted by position. Non-finite anchors and anchors repeating a position are dropped; at least
    /// two distinct anchors must remain, and their values must be strictly increasing or strictly decreasing.
    pub fn new<I>(axis: Axis, anchors: I) -> Result<Calibration, ExtractError>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut anchors: Vec<(f64, f64)> = anchors
            .into_iter()
            .filter(|(position, value)| position.is_finite() && value.is_finite())
            .collect();
        anchors.sort_by(|a, b| a.0.total_cmp(&b.0));
        anchors.dedup_by(|later, earlier| later.0 == earlier.0);
        if anchors.len() < 2 {
            return Err(ExtractError::NotEnoughTicks {
                axis,
                found: anchors.len(),
            });
        }
        let ascending = anchors[1].1 > anchors[0].1;
        let broken = anchors.windows(2).find(|pair| {
            let (v0, v1) = (pair[0].1, pair[1].1);
            if ascending {
                v1 <= v0
            } else {
                v1 >= v0
            }
        });
        if let Some(pair) = broken {
            return Err(ExtractError::NonMonotoneTicks {
                axis,
                position: pair[1].0,
            });
        }
        Ok(Calibration { axis, anchors })
    }

    /// The axis this calibration applies to
    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// The anchors in use, sorted by position
    #[inline]
    pub fn anchors(&self) -> &[(f64, f64)] {
        &self.anchors
    }

    /// Map a pixel position to a data value.
    ///
    /// Positions between ticks interpolate between the two ticks bracketing them; positions beyond the outermost
    /// ticks extrapolate along the outermost segment. Mapping a tick's own position yields its value exactly.
    pub fn map(&self, pixel: f64) -> f64 {
        let last = self.anchors.len() - 1;
        let upper = self
            .anchors
            .partition_point(|(position, _)| *position <= pixel)
            .clamp(1, last);
        let (p0, v0) = self.anchors[upper - 1];
        let (p1, v1) = self.anchors[upper];
        let t = (pixel - p0) / (p1 - p0);
        (1.0 - t) * v0 + t * v1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_at_anchors() {
        let cal = Calibration::new(Axis::Y, vec![(210.0, 0.0), (10.0, 100.0), (110.0, 50.0)]).unwrap();
        assert_eq!(cal.map(210.0), 0.0);
        assert_eq!(cal.map(110.0), 50.0);
        assert_eq!(cal.map(10.0), 100.0);
    }

    #[test]
    fn interpolates_between_nearest_ticks() {
        // Non-uniform tick spacing: each segment has its own slope
        let cal = Calibration::new(Axis::X, vec![(0.0, 0.0), (10.0, 10.0), (20.0, 110.0)]).unwrap();
        assert_eq!(cal.map(5.0), 5.0);
        assert_eq!(cal.map(15.0), 60.0);
    }

    #[test]
    fn extrapolates_beyond_ticks() {
        let cal = Calibration::new(Axis::X, vec![(10.0, 1.0), (20.0, 2.0)]).unwrap();
        assert!((cal.map(0.0) - 0.0).abs() < 1e-12);
        assert!((cal.map(40.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_too_few_ticks() {
        let err = Calibration::new(Axis::X, vec![(10.0, 1.0), (10.0, 2.0), (f64::NAN, 3.0)]).unwrap_err();
        match err {
            ExtractError::NotEnoughTicks { axis, found } => {
                assert_eq!(axis, Axis::X);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn rejects_scrambled_ticks() {
        let err = Calibration::new(Axis::X, vec![(0.0, 0.0), (10.0, 20.0), (20.0, 5.0)]).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::NonMonotoneTicks {
                axis: Axis::X,
                position
            } if position == 20.0
        ));
        assert!(Calibration::new(Axis::Y, vec![(0.0, 3.0), (10.0, 3.0)]).is_err());
        assert!(Calibration::new(Axis::Y, vec![(0.0, 3.0), (10.0, 2.0), (20.0, 1.0)]).is_ok());
    }
}

/*!
Forecast post-processing and evaluation
*/
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The lowest physically valid power output
pub const MIN_POWER: f64 = 0.0;

/// The highest physically valid power output
pub const MAX_POWER: f64 = 5500.0;

/// An invalid clip range
#[derive(Debug, Copy, Clone, PartialEq, Error)]
#[error("invalid clip range [{min}, {max}]")]
pub struct InvalidClipRange {
    /// The requested lower bound
    pub min: f64,
    /// The requested upper bound
    pub max: f64,
}

/// A closed range predictions are clipped to
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct ClipRange {
    min: f64,
    max: f64,
}

impl ClipRange {
    /// Create a clip range; both bounds must be finite and `min <= max`
    pub fn new(min: f64, max: f64) -> Result<ClipRange, InvalidClipRange> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(InvalidClipRange { min, max });
        }
        Ok(ClipRange { min, max })
    }
    /// The lower bound
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }
    /// The upper bound
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }
    /// Clamp a value to the nearest bound if it lies outside the range. `NaN` stays `NaN`
    #[inline]
    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl Default for ClipRange {
    fn default() -> ClipRange {
        ClipRange {
            min: MIN_POWER,
            max: MAX_POWER,
        }
    }
}

impl TryFrom<(f64, f64)> for ClipRange {
    type Error = InvalidClipRange;
    fn try_from((min, max): (f64, f64)) -> Result<ClipRange, InvalidClipRange> {
        ClipRange::new(min, max)
    }
}

impl From<ClipRange> for (f64, f64) {
    fn from(range: ClipRange) -> (f64, f64) {
        (range.min, range.max)
    }
}

/// Error metrics of a single forecast horizon
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonMetrics {
    /// The horizon, starting at 1 for the aligned timestep
    pub horizon: usize,
    /// The number of forecasts evaluated
    pub count: usize,
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean of prediction minus target
    pub bias: f64,
}

impl fmt::Display for HorizonMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h+{:<3} n = {:<6} MAE = {:>10.3}  RMSE = {:>10.3}  bias = {:>+10.3}",
            self.horizon, self.count, self.mae, self.rmse, self.bias
        )
    }
}

/// Compute error metrics per horizon.
///
/// `predictions[i][h]` and `targets[i][h]` are the forecast and actual value of sample `i` at horizon `h + 1`.
/// Pairs where either side is not finite are left out.
pub fn horizon_metrics<P, T>(predictions: &[P], targets: &[T]) -> Vec<HorizonMetrics>
where
    P: AsRef<[f64]>,
    T: AsRef<[f64]>,
{
    let horizons = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| p.as_ref().len().min(t.as_ref().len()))
        .max()
        .unwrap_or(0);
    (0..horizons)
        .map(|h| {
            let mut count = 0;
            let (mut abs, mut sq, mut signed) = (0.0, 0.0, 0.0);
            for (p, t) in predictions.iter().zip(targets) {
                let (p, t) = match (p.as_ref().get(h), t.as_ref().get(h)) {
                    (Some(p), Some(t)) if p.is_finite() && t.is_finite() => (*p, *t),
                    _ => continue,
                };
                let err = p - t;
                count += 1;
                abs += err.abs();
                sq += err * err;
                signed += err;
            }
            let n = count.max(1) as f64;
            HorizonMetrics {
                horizon: h + 1,
                count,
                mae: abs / n,
                rmse: (sq / n).sqrt(),
                bias: signed / n,
            }
        })
        .collect()
}

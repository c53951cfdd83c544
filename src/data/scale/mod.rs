/*!
Input data scaling
*/
use crate::CpuFloat;
use num::Float;
use serde::{Deserialize, Serialize};

/// Standard (z-score) scaling of a single column
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaler<F = CpuFloat> {
    /// The mean of the column's fitting data
    pub mean: F,
    /// The standard deviation of the column's fitting data
    pub std: F,
}

impl<F> ColumnScaler<F>
where
    F: Copy + Float,
{
    /// Fit a scaler to a column, ignoring non-finite values
    pub fn fit<I: IntoIterator<Item = F>>(values: I) -> ColumnScaler<F> {
        let mut n = F::zero();
        let mut mean = F::zero();
        let mut m2 = F::zero();
        // Welford's online algorithm
        for value in values.into_iter().filter(|value| value.is_finite()) {
            n = n + F::one();
            let delta = value - mean;
            mean = mean + delta / n;
            m2 = m2 + delta * (value - mean);
        }
        let std = if n > F::zero() { (m2 / n).sqrt() } else { F::zero() };
        ColumnScaler { mean, std }
    }
    /// Scale a value
    #[inline]
    pub fn scale(&self, value: F) -> F {
        // Return 0 for NaN and Inf
        if !value.is_finite() || self.std == F::zero() {
            return F::zero();
        }
        (value - self.mean) / self.std
    }
    /// Undo the scaling of a value
    #[inline]
    pub fn unscale(&self, value: F) -> F {
        value * self.std + self.mean
    }
}

/// Standard scaling of every column of a row-major table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StandardScaler<F = CpuFloat> {
    /// One scaler per column
    pub columns: Vec<ColumnScaler<F>>,
}

impl<F> StandardScaler<F>
where
    F: Copy + Float,
{
    /// Fit a scaler to rows of `width` columns. Rows are taken from the training data only, so that no statistics
    /// of later data leak into earlier inputs
    pub fn fit<'a, I>(width: usize, rows: I) -> StandardScaler<F>
    where
        I: IntoIterator<Item = &'a [F]> + Clone,
        F: 'a,
    {
        let columns = (0..width)
            .map(|col| {
                ColumnScaler::fit(
                    rows.clone()
                        .into_iter()
                        .filter_map(|row| row.get(col).copied()),
                )
            })
            .collect();
        StandardScaler { columns }
    }
    /// The number of columns scaled
    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }
    /// Scale a row in place. Columns beyond the scaler's width are left untouched
    #[inline]
    pub fn scale_row(&self, row: &mut [F]) {
        for (value, scaler) in row.iter_mut().zip(&self.columns) {
            *value = scaler.scale(*value);
        }
    }
}

// src/pulse_shape.rs
//! Reference pulse shape
//!
//! The shape is a table of `time value` pairs (ns, arbitrary units) read from
//! a text file. It is normalised to a unit peak and evaluated by linear
//! interpolation; outside the table the pulse is zero. The time derivative is
//! the central difference of the interpolant, which at a knot equals the mean
//! of the two adjacent segment slopes.

use crate::error::{CaloError, CaloErrorBuilder, CaloResult};
use crate::error_context;
use crate::utils::array_file::read_rows;
use ndarray::Array1;
use std::path::Path;
use tracing::debug;

/// Reference pulse normalised to a unit peak, linearly interpolated
#[derive(Debug, Clone, PartialEq)]
pub struct PulseShape {
    times: Vec<f64>,
    values: Vec<f64>,
    /// Half of the smallest knot spacing
    step: f64,
}

impl PulseShape {
    /// Build from raw knots; times must be strictly increasing
    pub fn from_points(times: Vec<f64>, values: Vec<f64>) -> CaloResult<Self> {
        if times.len() != values.len() {
            return Err(CaloErrorBuilder::new("pulse_shape", "from_points")
                .dimension_mismatch("values", times.len(), values.len()));
        }
        if times.len() < 2 {
            return Err(CaloErrorBuilder::new("pulse_shape", "from_points")
                .configuration("pulse shape needs at least two points"));
        }
        if times.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(CaloErrorBuilder::new("pulse_shape", "from_points")
                .configuration("pulse shape times must be strictly increasing"));
        }

        let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(peak > 0.0) || !peak.is_finite() {
            return Err(CaloError::Configuration {
                reason: format!("pulse shape peak must be positive, found {}", peak),
                context: error_context!("pulse_shape", "from_points"),
            });
        }

        let step = times
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(f64::INFINITY, f64::min)
            / 2.0;

        Ok(Self {
            values: values.into_iter().map(|v| v / peak).collect(),
            times,
            step,
        })
    }

    /// Load a `time value` table, skipping `#` comments
    pub fn from_file<P: AsRef<Path>>(path: P) -> CaloResult<Self> {
        let path = path.as_ref();
        let rows = read_rows(path, "pulse_shape_from_file")?;

        let mut times = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match row.as_slice() {
                [t, v, ..] => {
                    times.push(*t);
                    values.push(*v);
                }
                _ => {
                    return Err(CaloError::Parse {
                        path: path.to_path_buf(),
                        line: 0,
                        reason: format!("data row {} needs a time and a value", index + 1),
                        context: error_context!("pulse_shape", "from_file"),
                    })
                }
            }
        }

        let shape = Self::from_points(times, values)?;
        debug!(path = %path.display(), points = shape.len(), "pulse shape loaded");
        Ok(shape)
    }

    /// Number of knots
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always `false` for a constructed shape
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Knot times, in ns
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Normalised values, peak 1.0
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Linear interpolation, zero outside the table
    pub fn value_at(&self, t: f64) -> f64 {
        let (first, last) = (self.times[0], self.times[self.times.len() - 1]);
        if !(first..=last).contains(&t) {
            return 0.0;
        }

        // Index of the first knot strictly after t
        let upper = self.times.partition_point(|&x| x <= t);
        if upper == self.times.len() {
            return self.values[upper - 1];
        }
        let lower = upper - 1;

        let (t0, t1) = (self.times[lower], self.times[upper]);
        let (v0, v1) = (self.values[lower], self.values[upper]);
        v0 + (v1 - v0) * (t - t0) / (t1 - t0)
    }

    /// Central difference of the interpolated shape
    pub fn derivative_at(&self, t: f64) -> f64 {
        (self.value_at(t + self.step) - self.value_at(t - self.step)) / (2.0 * self.step)
    }

    /// Shape `g` and derivative `dg` at the filter tap offsets
    pub fn sample(&self, t_filter: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        (
            t_filter.mapv(|t| self.value_at(t)),
            t_filter.mapv(|t| self.derivative_at(t)),
        )
    }
}

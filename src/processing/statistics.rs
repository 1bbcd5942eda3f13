// src/processing/statistics.rs
//! Amplitude estimation over a continuous record and residual statistics
//!
//! The `(n_slices, slice_size)` sample matrix is read back as one continuous
//! row-major record. Weights are slid over it one sample at a time, giving
//! `(n_slices - 1) * slice_size + 1` estimates; each estimate is compared
//! against the true amplitude at the centre of its window.

use crate::error::{CaloErrorBuilder, CaloResult};
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of sliding positions over `n_slices` slices of `slice_size` samples
///
/// An empty record has no positions.
pub fn estimate_count(n_slices: usize, slice_size: usize) -> usize {
    if n_slices == 0 || slice_size == 0 {
        return 0;
    }
    (n_slices - 1) * slice_size + 1
}

fn check_layout(
    matrix: &Array2<f64>,
    what: &'static str,
    n_slices: usize,
    slice_size: usize,
    operation: &str,
) -> CaloResult<()> {
    if n_slices == 0 || slice_size == 0 {
        return Err(CaloErrorBuilder::new("statistics", operation).shape_mismatch(
            what,
            "at least one slice of at least one sample",
            format!("({}, {})", n_slices, slice_size),
        ));
    }
    if matrix.dim() != (n_slices, slice_size) {
        return Err(CaloErrorBuilder::new("statistics", operation).shape_mismatch(
            what,
            format!("({}, {})", n_slices, slice_size),
            format!("{:?}", matrix.dim()),
        ));
    }
    Ok(())
}

/// Row-major flattening, independent of the memory layout of `matrix`
fn flatten(matrix: &Array2<f64>) -> Array1<f64> {
    matrix.iter().copied().collect()
}

/// Slide `weights` over the flattened `samples`, one estimate per position
pub fn estimate_amplitudes(
    samples: &Array2<f64>,
    weights: &Array1<f64>,
    n_slices: usize,
    slice_size: usize,
) -> CaloResult<Array1<f64>> {
    check_layout(samples, "samples", n_slices, slice_size, "estimate_amplitudes")?;
    if weights.len() != slice_size {
        return Err(CaloErrorBuilder::new("statistics", "estimate_amplitudes")
            .shape_mismatch("weights", slice_size, weights.len()));
    }

    let record = flatten(samples);
    let estimates: Array1<f64> = record
        .windows(slice_size)
        .into_iter()
        .map(|window| window.dot(weights))
        .collect();

    debug!(n_estimates = estimates.len(), slice_size, "amplitudes estimated");
    Ok(estimates)
}

/// Residuals `estimated - target`, where the targets are the true amplitudes
/// at the centre of every sliding window
pub fn compare_amplitudes(
    test_amplitudes: &Array2<f64>,
    n_slices: usize,
    slice_size: usize,
    estimated: &Array1<f64>,
) -> CaloResult<Array1<f64>> {
    check_layout(test_amplitudes, "test_amplitudes", n_slices, slice_size, "compare_amplitudes")?;

    let half = slice_size / 2;
    let record = flatten(test_amplitudes);
    let target = record.slice(s![half..n_slices * slice_size - half]);

    if target.len() != estimated.len() {
        return Err(CaloErrorBuilder::new("statistics", "compare_amplitudes")
            .shape_mismatch("estimated amplitudes", target.len(), estimated.len()));
    }

    Ok(estimated - &target)
}

/// Sample mean and population standard deviation of a residual series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Residuals summarised
    pub count: usize,
    /// Mean residual
    pub mean: f64,
    /// Population standard deviation (`ddof = 0`)
    pub std_dev: f64,
}

impl ErrorSummary {
    /// Summarise a non-empty residual series
    pub fn from_errors(errors: &Array1<f64>) -> CaloResult<Self> {
        let mean = errors.mean().ok_or_else(|| {
            CaloErrorBuilder::new("statistics", "summarize")
                .shape_mismatch("errors", "non-empty residual series", 0)
        })?;

        Ok(Self {
            count: errors.len(),
            mean,
            std_dev: errors.std(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaloError;
    use ndarray::array;

    #[test]
    fn test_single_slice_gives_single_estimate() {
        let samples = array![[1.0, 2.0, 3.0]];
        let weights = array![-0.5, 1.0, -0.5];

        let estimates = estimate_amplitudes(&samples, &weights, 1, 3).unwrap();
        assert_eq!(estimates, array![0.0]);
    }

    #[test]
    fn test_windows_cross_slice_boundaries() {
        let samples = array![[0.0, 1.0, 0.0], [0.0, 2.0, 0.0]];
        let weights = array![0.0, 1.0, 0.0];

        let estimates = estimate_amplitudes(&samples, &weights, 2, 3).unwrap();
        assert_eq!(estimates.len(), estimate_count(2, 3));
        assert_eq!(estimates, array![1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_estimate_count() {
        assert_eq!(estimate_count(1, 7), 1);
        assert_eq!(estimate_count(300, 7), 299 * 7 + 1);
        assert_eq!(estimate_count(0, 7), 0);
        assert_eq!(estimate_count(5, 0), 0);
    }

    #[test]
    fn test_estimate_preconditions() {
        let samples = Array2::<f64>::zeros((4, 3));

        let err = estimate_amplitudes(&samples, &array![1.0, 0.0], 4, 3).unwrap_err();
        assert!(matches!(err, CaloError::ShapeMismatch { what: "weights", .. }));

        let err = estimate_amplitudes(&samples, &array![0.0, 1.0, 0.0], 5, 3).unwrap_err();
        assert!(matches!(err, CaloError::ShapeMismatch { what: "samples", .. }));

        let empty = Array2::<f64>::zeros((0, 3));
        let err = estimate_amplitudes(&empty, &array![0.0, 1.0, 0.0], 0, 3).unwrap_err();
        assert_eq!(err.kind(), "ShapeMismatch");
    }

    #[test]
    fn test_compare_centres_targets() {
        let amplitudes = array![[10.0, 11.0, 12.0], [13.0, 14.0, 15.0]];
        let estimated = array![11.5, 12.0, 13.0, 13.0];

        let errors = compare_amplitudes(&amplitudes, 2, 3, &estimated).unwrap();
        assert_eq!(errors, array![0.5, 0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_compare_length_mismatch() {
        let amplitudes = Array2::<f64>::zeros((3, 3));
        let err = compare_amplitudes(&amplitudes, 3, 3, &Array1::zeros(6)).unwrap_err();

        match err {
            CaloError::ShapeMismatch { expected, actual, .. } => {
                assert_eq!(expected, "7");
                assert_eq!(actual, "6");
            }
            other => panic!("Expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_even_slice_size_cannot_be_compared() {
        let samples = Array2::from_shape_fn((3, 4), |(i, j)| (i * 4 + j) as f64);
        let estimated = estimate_amplitudes(&samples, &array![0.0, 1.0, 0.0, 0.0], 3, 4).unwrap();

        let err = compare_amplitudes(&samples, 3, 4, &estimated).unwrap_err();
        assert_eq!(err.kind(), "ShapeMismatch");
    }

    #[test]
    fn test_identity_round_trip_has_zero_error() {
        let amplitudes = Array2::from_shape_fn((5, 7), |(i, j)| (i * 7 + j) as f64 * 3.5);
        let mut weights = Array1::zeros(7);
        weights[3] = 1.0;

        let estimated = estimate_amplitudes(&amplitudes, &weights, 5, 7).unwrap();
        let errors = compare_amplitudes(&amplitudes, 5, 7, &estimated).unwrap();

        assert_eq!(errors.len(), 29);
        assert!(errors.iter().all(|e| *e == 0.0));

        let summary = ErrorSummary::from_errors(&errors).unwrap();
        assert_eq!(summary.count, 29);
        assert_eq!(summary.mean, 0.0);
        assert_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn test_summary_uses_population_std() {
        let summary = ErrorSummary::from_errors(&array![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(summary.mean, 2.5);
        assert!((summary.std_dev - 1.25_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary_rejected() {
        let err = ErrorSummary::from_errors(&Array1::zeros(0)).unwrap_err();
        assert_eq!(err.kind(), "ShapeMismatch");
    }
}

// src/linalg.rs
//! Dense linear algebra for the filter solves
//!
//! Data lives in `ndarray` containers throughout the crate; the square solves
//! and inverses are delegated to `nalgebra`. A matrix is numerically rank
//! deficient when its reciprocal condition number is at or below
//! [`rank_tolerance`], which scales machine epsilon by the matrix order. Such a
//! matrix is reported as [`CaloError::SingularSystem`] instead of returning an
//! ill-defined solution: an LU factorisation of a rank-deficient matrix rarely
//! hits an exact zero pivot in floating point.

use crate::error::{CaloError, CaloResult};
use crate::error_context;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

/// Multiple of `n · ε` used as the rank cutoff
pub const RANK_TOLERANCE_FACTOR: f64 = 16.0;

/// Largest `σ_min / σ_max` still treated as rank deficient for an `n × n` matrix
pub fn rank_tolerance(n: usize) -> f64 {
    n as f64 * RANK_TOLERANCE_FACTOR * f64::EPSILON
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

fn check_square(a: &Array2<f64>, system: &'static str, operation: &str) -> CaloResult<()> {
    if a.nrows() != a.ncols() || a.nrows() == 0 {
        return Err(CaloError::ShapeMismatch {
            what: system,
            expected: "non-empty square matrix".to_string(),
            actual: format!("{}x{}", a.nrows(), a.ncols()),
            context: error_context!("linalg", operation),
        });
    }
    Ok(())
}

/// Reciprocal 2-norm condition number, `σ_min / σ_max`
pub fn reciprocal_condition(a: &Array2<f64>) -> f64 {
    let singular_values = to_dmatrix(a).singular_values();
    let max = singular_values.max();
    let min = singular_values.min();
    if max > 0.0 && max.is_finite() {
        min / max
    } else {
        0.0
    }
}

fn ensure_well_conditioned(a: &Array2<f64>, system: &'static str, operation: &str) -> CaloResult<()> {
    let rcond = reciprocal_condition(a);
    let tolerance = rank_tolerance(a.nrows());
    // NaN falls through to the error branch
    if !(rcond > tolerance) {
        return Err(CaloError::SingularSystem {
            system,
            reason: format!("reciprocal condition number {:.3e} at or below {:.3e}", rcond, tolerance),
            context: error_context!("linalg", operation),
        });
    }
    Ok(())
}

/// Solve `A x = b` for a square `A`
pub fn solve(a: &Array2<f64>, b: &Array1<f64>, system: &'static str) -> CaloResult<Array1<f64>> {
    check_square(a, system, "solve")?;
    if b.len() != a.nrows() {
        return Err(CaloError::ShapeMismatch {
            what: system,
            expected: format!("right-hand side of length {}", a.nrows()),
            actual: b.len().to_string(),
            context: error_context!("linalg", "solve"),
        });
    }
    ensure_well_conditioned(a, system, "solve")?;

    let rhs = DVector::from_iterator(b.len(), b.iter().copied());
    let x = to_dmatrix(a).lu().solve(&rhs).ok_or_else(|| CaloError::SingularSystem {
        system,
        reason: "LU factorisation hit a zero pivot".to_string(),
        context: error_context!("linalg", "solve"),
    })?;

    Ok(Array1::from_iter(x.iter().copied()))
}

/// Inverse of a square matrix
pub fn inverse(a: &Array2<f64>, system: &'static str) -> CaloResult<Array2<f64>> {
    check_square(a, system, "inverse")?;
    ensure_well_conditioned(a, system, "inverse")?;

    let inv = to_dmatrix(a).try_inverse().ok_or_else(|| CaloError::SingularSystem {
        system,
        reason: "matrix is not invertible".to_string(),
        context: error_context!("linalg", "inverse"),
    })?;

    Ok(to_array2(&inv))
}

/// Elementwise `|a - b| <= atol + rtol * |b|`
pub fn allclose(a: &Array1<f64>, b: &Array1<f64>, rtol: f64, atol: f64) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| (x - y).abs() <= atol + rtol * y.abs())
}

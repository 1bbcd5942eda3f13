// src/processing/filters/of2.rs
//! OF2 optimal filter
//!
//! Weights are the minimum-norm vector satisfying three linear constraints:
//! unit gain on the reference pulse (`w·g = 1`), no first-order sensitivity to
//! a phase shift (`w·dg = 0`) and pedestal rejection (`Σw = 0`). The
//! constraints are enforced with Lagrange multipliers by bordering an identity
//! block, which gives the `(n + 3) × (n + 3)` system `A x = b`.

use super::{check_feasibility, Estimator, FilterOutput, FilterSpec, SolutionStatus};
use crate::config::constants::filter::{SOLVE_ATOL, SOLVE_RTOL};
use crate::error::CaloResult;
use crate::linalg;
use crate::pulse_shape::PulseShape;
use ndarray::{s, Array1, Array2};
use tracing::{debug, warn};

/// Number of constraint rows bordering the identity block
const CONSTRAINTS: usize = 3;

/// Analytic optimal filter built from a reference pulse shape
#[derive(Debug, Clone)]
pub struct Of2 {
    spec: FilterSpec,
}

impl Of2 {
    /// Create the filter from tap offsets, pulse shape and its derivative
    pub fn new(
        n_filter: usize,
        t_filter: Array1<f64>,
        g: Array1<f64>,
        dg: Array1<f64>,
    ) -> CaloResult<Self> {
        let spec = FilterSpec::new(n_filter, Some(t_filter), Some(g), Some(dg))?;
        Ok(Self { spec })
    }

    /// Sample `g` and `dg` from a pulse shape at the given offsets
    pub fn from_pulse_shape(shape: &PulseShape, t_filter: Array1<f64>) -> CaloResult<Self> {
        let (g, dg) = shape.sample(&t_filter);
        Self::new(t_filter.len(), t_filter, g, dg)
    }

    /// Validated filter inputs
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Bordered constraint matrix `A`
    pub fn matrix_a(&self) -> CaloResult<Array2<f64>> {
        let n = self.spec.n_filter();
        let (g, dg) = self.spec.require_pulse_shape()?;
        let ones = Array1::<f64>::ones(n);

        let mut a = Array2::<f64>::zeros((n + CONSTRAINTS, n + CONSTRAINTS));
        a.slice_mut(s![..n, ..n]).assign(&Array2::eye(n));

        a.slice_mut(s![n, ..n]).assign(g);
        a.slice_mut(s![n + 1, ..n]).assign(dg);
        a.slice_mut(s![n + 2, ..n]).assign(&ones);

        a.slice_mut(s![..n, n]).assign(&g.mapv(|v| -v));
        a.slice_mut(s![..n, n + 1]).assign(&dg.mapv(|v| -v));
        a.slice_mut(s![..n, n + 2]).assign(&ones.mapv(|v| -v));

        Ok(a)
    }

    /// Right-hand side `b`: unit gain, everything else zero
    pub fn vector_b(&self) -> Array1<f64> {
        let n = self.spec.n_filter();
        let mut b = Array1::<f64>::zeros(n + CONSTRAINTS);
        b[n] = 1.0;
        b
    }

    /// Full solution `[weights; λ_gain, λ_phase, λ_pedestal]`
    pub fn solve_system(&self) -> CaloResult<(Array2<f64>, Array1<f64>, Array1<f64>)> {
        let a = self.matrix_a()?;
        let b = self.vector_b();
        let x = linalg::solve(&a, &b, "OF2 constraint matrix")?;
        Ok((a, b, x))
    }

    fn check_solution(a: &Array2<f64>, b: &Array1<f64>, x: &Array1<f64>, weights: &Array1<f64>) -> SolutionStatus {
        let reproduces_b = linalg::allclose(&a.dot(x), b, SOLVE_RTOL, SOLVE_ATOL);
        if !reproduces_b {
            return SolutionStatus::Infeasible;
        }
        check_feasibility(weights)
    }
}

impl Estimator for Of2 {
    fn go_filtering(&self) -> CaloResult<FilterOutput> {
        let n = self.spec.n_filter();
        let (a, b, x) = self.solve_system()?;
        let weights = x.slice(s![..n]).to_owned();

        let status = Self::check_solution(&a, &b, &x, &weights);
        debug!(n_filter = n, sum = weights.sum(), ?status, "OF2 solved");
        if !status.is_feasible() {
            warn!(?weights, "OF2 solution violates its feasibility bounds");
        }

        Ok(FilterOutput { weights, status })
    }

    fn n_filter(&self) -> usize {
        self.spec.n_filter()
    }

    fn name(&self) -> &'static str {
        "OF2"
    }
}

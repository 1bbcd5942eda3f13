// src/processing/filters/least_squares.rs
//! Constrained least-squares filter
//!
//! Fits weights `w` minimising `‖S w − a‖²` over training windows `S` and their
//! central amplitudes `a`, subject to the pedestal constraint `Σw = 0`. The
//! unconstrained normal-equation solution is projected onto the constraint
//! with a single Lagrange multiplier.

use super::{check_feasibility, Estimator, FilterOutput, FilterSpec};
use crate::dataset::Dataset;
use crate::error::{CaloError, CaloErrorBuilder, CaloResult};
use crate::error_context;
use crate::linalg;
use ndarray::{Array1, Array2};
use tracing::{debug, warn};

/// Target of the pedestal constraint `vec_a · w = b`
const CONSTRAINT_TARGET: f64 = 0.0;

/// Least-squares estimator trained on sample windows
#[derive(Debug, Clone)]
pub struct LeastSquares {
    spec: FilterSpec,
    samples: Array2<f64>,
    amplitudes: Array1<f64>,
}

impl LeastSquares {
    /// `samples` is `(n_samples, n_filter)`, `amplitudes` one value per row
    pub fn new(samples: Array2<f64>, amplitudes: Array1<f64>, n_filter: usize) -> CaloResult<Self> {
        let spec = FilterSpec::new(n_filter, None, None, None)?;
        Self::with_spec(spec, samples, amplitudes)
    }

    /// Attach a pulse shape; it is validated but not used by the fit
    pub fn with_pulse_shape(
        samples: Array2<f64>,
        amplitudes: Array1<f64>,
        n_filter: usize,
        t_filter: Array1<f64>,
        g: Array1<f64>,
        dg: Array1<f64>,
    ) -> CaloResult<Self> {
        let spec = FilterSpec::new(n_filter, Some(t_filter), Some(g), Some(dg))?;
        Self::with_spec(spec, samples, amplitudes)
    }

    /// Train on a dataset, using the central amplitude of each slice
    pub fn from_dataset(dataset: &Dataset) -> CaloResult<Self> {
        Self::new(
            dataset.samples().to_owned(),
            dataset.central_amplitudes(),
            dataset.slice_size(),
        )
    }

    fn with_spec(spec: FilterSpec, samples: Array2<f64>, amplitudes: Array1<f64>) -> CaloResult<Self> {
        let n_filter = spec.n_filter();
        if samples.ncols() != n_filter {
            return Err(CaloErrorBuilder::new("least_squares", "new")
                .dimension_mismatch("samples", n_filter, samples.ncols()));
        }
        if amplitudes.len() != samples.nrows() {
            return Err(CaloErrorBuilder::new("least_squares", "new")
                .dimension_mismatch("amplitudes", samples.nrows(), amplitudes.len()));
        }

        Ok(Self {
            spec,
            samples,
            amplitudes,
        })
    }

    /// Validated filter inputs
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Training windows
    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    /// Unconstrained estimate `w0 = (SᵗS)⁻¹ Sᵗ a`, alongside `(SᵗS)⁻¹`
    fn predict_w(&self) -> CaloResult<(Array2<f64>, Array1<f64>)> {
        let gram = self.samples.t().dot(&self.samples);
        let mat_h_inv = linalg::inverse(&gram, "training Gram matrix SᵗS")?;
        let w0 = mat_h_inv.dot(&self.samples.t().dot(&self.amplitudes));
        Ok((mat_h_inv, w0))
    }

    /// Project `w0` onto `Σw = 0`
    fn solve_cstr_ls(&self) -> CaloResult<Array1<f64>> {
        let (mat_h_inv, w0) = self.predict_w()?;
        let vec_a = Array1::<f64>::ones(self.spec.n_filter());

        let mat_h_a = mat_h_inv.dot(&vec_a);
        let denominator = vec_a.dot(&mat_h_a);
        if !denominator.is_finite() || denominator == 0.0 {
            return Err(CaloError::SingularSystem {
                system: "constraint term a·H·aᵗ",
                reason: format!("scalar {:e} cannot be inverted", denominator),
                context: error_context!("least_squares", "solve_cstr_ls"),
            });
        }
        let scalar_inv = 1.0 / denominator;

        let cstr_lagr = vec_a.dot(&w0) - CONSTRAINT_TARGET;
        debug!(lagrangian_residual = cstr_lagr, "projecting onto zero-sum constraint");

        Ok(&w0 - &(mat_h_a * (scalar_inv * cstr_lagr)))
    }
}

impl Estimator for LeastSquares {
    fn go_filtering(&self) -> CaloResult<FilterOutput> {
        let weights = self.solve_cstr_ls()?;
        let status = check_feasibility(&weights);

        debug!(
            n_filter = self.spec.n_filter(),
            n_samples = self.n_samples(),
            sum = weights.sum(),
            ?status,
            "least squares solved"
        );
        if !status.is_feasible() {
            warn!(?weights, "least-squares solution violates its feasibility bounds");
        }

        Ok(FilterOutput { weights, status })
    }

    fn n_filter(&self) -> usize {
        self.spec.n_filter()
    }

    fn name(&self) -> &'static str {
        "LS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::filters::SolutionStatus;
    use ndarray::{array, Axis};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn reference_g() -> Array1<f64> {
        array![0.0, 0.0172, 0.4524, 1.0, 0.5633, 0.1493, 0.0424]
    }

    /// Pulse `g` displaced by `shift` samples, zero padded
    fn shifted(g: &Array1<f64>, shift: isize) -> Array1<f64> {
        let n = g.len() as isize;
        Array1::from_shape_fn(g.len(), |m| {
            let src = m as isize - shift;
            if (0..n).contains(&src) {
                g[src as usize]
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_noiseless_pileup_recovers_amplitudes() {
        let g = reference_g();
        let shifts = [-2, -1, 1, 2, 3];
        let n_rows = 200;
        let mut rng = StdRng::seed_from_u64(7);

        let amplitudes = Array1::from_shape_fn(n_rows, |i| i as f64 * 1023.0 / (n_rows - 1) as f64);
        let mut samples = Array2::<f64>::zeros((n_rows, 7));
        for (i, mut row) in samples.axis_iter_mut(Axis(0)).enumerate() {
            let pedestal: f64 = rng.gen_range(0.0..50.0);
            let mut window = &g * amplitudes[i] + pedestal;
            for &shift in &shifts {
                let neighbour: f64 = rng.gen_range(0.0..200.0);
                window = window + shifted(&g, shift) * neighbour;
            }
            row.assign(&window);
        }

        let ls = LeastSquares::new(samples.clone(), amplitudes.clone(), 7).unwrap();
        let output = ls.go_filtering().unwrap();

        // Cancelling five neighbours needs a centre weight near 2.44
        assert_eq!(output.status, SolutionStatus::Infeasible);
        assert!(output.feasible_weights().is_none());
        assert!(output.weights.iter().any(|w| w.abs() > 1.0));
        assert!(output.weights.sum().abs() < 1e-9);
        let reconstructed = samples.dot(&output.weights);
        for (r, a) in reconstructed.iter().zip(amplitudes.iter()) {
            assert!((r - a).abs() < 1e-4, "reconstructed {} vs true {}", r, a);
        }
    }

    #[test]
    fn test_noisy_training_is_feasible() {
        let g = reference_g();
        let n_rows = 2000;
        let mut rng = StdRng::seed_from_u64(42);

        let amplitudes: Array1<f64> = Array1::from_shape_fn(n_rows, |_| rng.gen_range(10.0..1000.0));
        let samples = Array2::from_shape_fn((n_rows, 7), |(i, j)| {
            let noise: f64 = rng.gen_range(-1.5..1.5);
            amplitudes[i] * g[j] + 40.0 + noise
        });

        let ls = LeastSquares::new(samples.clone(), amplitudes.clone(), 7).unwrap();
        let output = ls.go_filtering().unwrap();

        assert_eq!(output.status, SolutionStatus::Feasible);
        assert!(output.weights.sum().abs() < 1e-12);

        let residuals = samples.dot(&output.weights) - &amplitudes;
        let mean_abs = residuals.mapv(f64::abs).mean().unwrap();
        assert!(mean_abs < 2.0, "mean absolute residual {}", mean_abs);
    }

    #[test]
    fn test_low_noise_training_is_not_singular() {
        // SᵗS condition number here is around 2e12
        let g = reference_g();
        let n_rows = 2000;
        let mut rng = StdRng::seed_from_u64(5);

        let amplitudes: Array1<f64> = Array1::from_shape_fn(n_rows, |_| rng.gen_range(10.0..1000.0));
        let samples = Array2::from_shape_fn((n_rows, 7), |(i, j)| {
            let noise: f64 = rng.gen_range(-1e-3..1e-3);
            amplitudes[i] * g[j] + 40.0 + noise
        });

        let gram = samples.t().dot(&samples);
        assert!(linalg::reciprocal_condition(&gram) < 1e-12);

        let ls = LeastSquares::new(samples.clone(), amplitudes.clone(), 7).unwrap();
        let output = ls.go_filtering().unwrap();

        assert_eq!(output.status, SolutionStatus::Feasible);
        let residuals = samples.dot(&output.weights) - &amplitudes;
        let mean_abs = residuals.mapv(f64::abs).mean().unwrap();
        assert!(mean_abs < 1e-2, "mean absolute residual {}", mean_abs);
    }

    #[test]
    fn test_identical_rows_are_singular() {
        let row = reference_g() * 100.0;
        let samples = Array2::from_shape_fn((50, 7), |(_, j)| row[j]);
        let amplitudes = Array1::from_elem(50, 100.0);

        let ls = LeastSquares::new(samples, amplitudes, 7).unwrap();
        let err = ls.go_filtering().unwrap_err();
        assert_eq!(err.kind(), "SingularSystem");
    }

    #[test]
    fn test_proportional_rows_are_singular() {
        let g = reference_g();
        let amplitudes = Array1::linspace(0.0, 1023.0, 64);
        let samples = Array2::from_shape_fn((64, 7), |(i, j)| amplitudes[i] * g[j]);

        let ls = LeastSquares::new(samples, amplitudes, 7).unwrap();
        assert_eq!(ls.go_filtering().unwrap_err().kind(), "SingularSystem");
    }

    #[test]
    fn test_too_few_rows_are_singular() {
        let samples = Array2::from_shape_fn((3, 7), |(i, j)| (i * 7 + j) as f64 + 1.0);
        let ls = LeastSquares::new(samples, array![1.0, 2.0, 3.0], 7).unwrap();
        assert_eq!(ls.go_filtering().unwrap_err().kind(), "SingularSystem");
    }

    #[test]
    fn test_shape_validation() {
        let err = LeastSquares::new(Array2::zeros((10, 5)), Array1::zeros(10), 7).unwrap_err();
        assert!(matches!(err, CaloError::DimensionMismatch { vector: "samples", expected: 7, actual: 5, .. }));

        let err = LeastSquares::new(Array2::zeros((10, 7)), Array1::zeros(9), 7).unwrap_err();
        assert!(matches!(err, CaloError::DimensionMismatch { vector: "amplitudes", expected: 10, actual: 9, .. }));

        let err = LeastSquares::with_pulse_shape(
            Array2::zeros((10, 7)),
            Array1::zeros(10),
            7,
            Array1::zeros(5),
            Array1::zeros(7),
            Array1::zeros(7),
        )
        .unwrap_err();
        assert!(matches!(err, CaloError::DimensionMismatch { vector: "t_filter", .. }));
    }
}

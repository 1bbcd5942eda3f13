// src/processing/filters/mod.rs
//! Amplitude reconstruction filters
//!
//! Every estimator validates its coefficient vectors through [`FilterSpec`]
//! and produces a [`FilterOutput`]: the weight vector plus a
//! [`SolutionStatus`]. An infeasible status does not withhold the weights;
//! callers decide whether to use them.

pub mod least_squares;
pub mod of2;

pub use least_squares::*;
pub use of2::*;

use crate::config::constants::filter::{PEDESTAL_SUM_TOLERANCE, WEIGHT_MAX, WEIGHT_MIN};
use crate::error::{CaloError, CaloErrorBuilder, CaloResult};
use crate::error_context;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Filter weights, one per window sample
pub type WeightVector = Array1<f64>;

/// Outcome of the feasibility check on a solved weight vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolutionStatus {
    /// Weights in bounds and summing to zero
    Feasible,
    /// Weights returned but unusable
    Infeasible,
}

impl SolutionStatus {
    /// `true` for [`SolutionStatus::Feasible`]
    pub fn is_feasible(self) -> bool {
        self == SolutionStatus::Feasible
    }
}

impl From<bool> for SolutionStatus {
    fn from(ok: bool) -> Self {
        if ok {
            SolutionStatus::Feasible
        } else {
            SolutionStatus::Infeasible
        }
    }
}

/// Weights together with the status of the run that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutput {
    /// Solved weights
    pub weights: WeightVector,
    /// Result of [`check_feasibility`] on `weights`
    pub status: SolutionStatus,
}

impl FilterOutput {
    /// Whether the weights may be used for estimation
    pub fn is_feasible(&self) -> bool {
        self.status.is_feasible()
    }

    /// Weights only if the solution passed its feasibility check
    pub fn feasible_weights(&self) -> Option<&WeightVector> {
        self.is_feasible().then_some(&self.weights)
    }
}

impl From<FilterOutput> for (WeightVector, SolutionStatus) {
    fn from(output: FilterOutput) -> Self {
        (output.weights, output.status)
    }
}

/// Common interface of the amplitude estimators
pub trait Estimator: Send + Sync {
    /// Solve for the weight vector
    fn go_filtering(&self) -> CaloResult<FilterOutput>;

    /// Window length the weights apply to
    fn n_filter(&self) -> usize;

    /// Short estimator name for logs and reports
    fn name(&self) -> &'static str;
}

/// Validated coefficient vectors shared by all estimators
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    n_filter: usize,
    t_filter: Option<Array1<f64>>,
    g: Option<Array1<f64>>,
    dg: Option<Array1<f64>>,
}

impl FilterSpec {
    /// Validate and store the filter inputs.
    ///
    /// `t_filter` and `g` must have `n_filter` entries when present, and `dg`
    /// must match `g` in length. Absent vectors are accepted; estimators that
    /// need a pulse shape call [`FilterSpec::require_pulse_shape`].
    pub fn new(
        n_filter: usize,
        t_filter: Option<Array1<f64>>,
        g: Option<Array1<f64>>,
        dg: Option<Array1<f64>>,
    ) -> CaloResult<Self> {
        if n_filter == 0 {
            return Err(CaloErrorBuilder::new("filter_spec", "new")
                .configuration("n_filter must be greater than zero"));
        }

        if let Some(t) = &t_filter {
            if t.len() != n_filter {
                return Err(CaloErrorBuilder::new("filter_spec", "new")
                    .dimension_mismatch("t_filter", n_filter, t.len()));
            }
        }

        if let Some(g) = &g {
            if g.len() != n_filter {
                return Err(CaloErrorBuilder::new("filter_spec", "new")
                    .dimension_mismatch("g", n_filter, g.len()));
            }
        }

        let g_len = g.as_ref().map_or(0, |g| g.len());
        let dg_len = dg.as_ref().map_or(0, |dg| dg.len());
        if g_len != dg_len {
            return Err(CaloErrorBuilder::new("filter_spec", "new")
                .dimension_mismatch("dg", g_len, dg_len));
        }

        Ok(Self {
            n_filter,
            t_filter,
            g,
            dg,
        })
    }

    /// Window length
    pub fn n_filter(&self) -> usize {
        self.n_filter
    }

    /// Tap time offsets, if given
    pub fn t_filter(&self) -> Option<&Array1<f64>> {
        self.t_filter.as_ref()
    }

    /// Pulse shape at the taps, if given
    pub fn g(&self) -> Option<&Array1<f64>> {
        self.g.as_ref()
    }

    /// Pulse shape derivative at the taps, if given
    pub fn dg(&self) -> Option<&Array1<f64>> {
        self.dg.as_ref()
    }

    /// Pulse shape and derivative, for estimators that cannot work without them
    pub fn require_pulse_shape(&self) -> CaloResult<(&Array1<f64>, &Array1<f64>)> {
        match (&self.g, &self.dg) {
            (Some(g), Some(dg)) => Ok((g, dg)),
            _ => Err(CaloError::Configuration {
                reason: "estimator requires pulse shape 'g' and derivative 'dg'".to_string(),
                context: error_context!("filter_spec", "require_pulse_shape"),
            }),
        }
    }
}

/// Weights inside `[-1, 1]` and summing to zero (pedestal rejection)
pub fn check_feasibility(weights: &WeightVector) -> SolutionStatus {
    let bounded = weights.iter().all(|w| (WEIGHT_MIN..=WEIGHT_MAX).contains(w));
    let zero_sum = weights.sum().abs() < PEDESTAL_SUM_TOLERANCE;
    SolutionStatus::from(bounded && zero_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_filter_spec_accepts_consistent_vectors() {
        let spec = FilterSpec::new(
            3,
            Some(array![-25.0, 0.0, 25.0]),
            Some(array![0.5, 1.0, 0.5]),
            Some(array![0.02, 0.0, -0.02]),
        )
        .unwrap();

        assert_eq!(spec.n_filter(), 3);
        assert!(spec.require_pulse_shape().is_ok());
    }

    #[test]
    fn test_filter_spec_t_filter_mismatch() {
        let err = FilterSpec::new(
            7,
            Some(array![-50.0, -25.0, 0.0, 25.0, 50.0]),
            None,
            None,
        )
        .unwrap_err();

        match err {
            CaloError::DimensionMismatch { vector, expected, actual, .. } => {
                assert_eq!(vector, "t_filter");
                assert_eq!(expected, 7);
                assert_eq!(actual, 5);
            }
            other => panic!("Expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_spec_g_and_dg_mismatch() {
        let err = FilterSpec::new(3, None, Some(array![0.5, 1.0]), Some(array![0.0, 0.0])).unwrap_err();
        assert!(matches!(err, CaloError::DimensionMismatch { vector: "g", .. }));

        let err = FilterSpec::new(3, None, Some(array![0.5, 1.0, 0.5]), Some(array![0.0])).unwrap_err();
        assert!(matches!(err, CaloError::DimensionMismatch { vector: "dg", expected: 3, actual: 1, .. }));

        let err = FilterSpec::new(3, None, None, Some(array![0.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(err, CaloError::DimensionMismatch { vector: "dg", .. }));
    }

    #[test]
    fn test_filter_spec_without_shape() {
        let spec = FilterSpec::new(5, None, None, None).unwrap();
        assert!(spec.t_filter().is_none());
        assert_eq!(spec.require_pulse_shape().unwrap_err().kind(), "Configuration");
    }

    #[test]
    fn test_zero_width_rejected() {
        assert_eq!(FilterSpec::new(0, None, None, None).unwrap_err().kind(), "Configuration");
    }

    #[test]
    fn test_feasibility_check() {
        assert_eq!(check_feasibility(&array![-0.5, 1.0, -0.5]), SolutionStatus::Feasible);
        // Sum is zero but a weight leaves [-1, 1]
        assert_eq!(check_feasibility(&array![-1.5, 3.0, -1.5]), SolutionStatus::Infeasible);
        // Bounded but not pedestal-free
        assert_eq!(check_feasibility(&array![0.1, 0.2, 0.3]), SolutionStatus::Infeasible);
    }

    #[test]
    fn test_filter_output_tuple_conversion() {
        let output = FilterOutput {
            weights: array![-0.5, 1.0, -0.5],
            status: SolutionStatus::Feasible,
        };
        assert!(output.feasible_weights().is_some());

        let (weights, status): (WeightVector, SolutionStatus) = output.into();
        assert_eq!(weights.len(), 3);
        assert!(status.is_feasible());
    }
}

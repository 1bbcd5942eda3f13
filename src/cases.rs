// src/cases.rs
//! Study cases
//!
//! A case solves one estimator, slides its weights over the test record and
//! summarises the residuals against the true amplitudes. Infeasible weights
//! are reported and the case is skipped rather than failed. Occupancy sweeps
//! run their cases in parallel; every case owns its own data and solver
//! scratch.

use crate::config::{AnalysisConfig, EstimatorKind};
use crate::dataset::{Dataset, DatasetProvider, FileDatasetProvider};
use crate::error::CaloResult;
use crate::processing::filters::{Estimator, LeastSquares, Of2, SolutionStatus, WeightVector};
use crate::processing::statistics::{compare_amplitudes, estimate_amplitudes, ErrorSummary};
use crate::pulse_shape::PulseShape;
use crate::report::Reporter;
use crate::utils::array_file::save_array_to_file;
use ndarray::Array1;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of one study case
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    /// `"LS"` or `"OF2"`
    pub estimator: &'static str,
    /// Occupancy of the dataset pair
    pub occupancy: f64,
    /// Weights as solved, feasible or not
    pub weights: WeightVector,
    /// Feasibility of `weights`
    pub status: SolutionStatus,
    /// `None` when the weights were infeasible and the case was skipped
    pub summary: Option<ErrorSummary>,
    /// Residuals `estimated - true` over the test record
    pub errors: Option<Array1<f64>>,
    /// Residual file, when `output.save_errors` is set
    pub saved_to: Option<PathBuf>,
}

impl CaseOutcome {
    /// Infeasible weights stop a case before estimation
    pub fn was_skipped(&self) -> bool {
        self.summary.is_none()
    }
}

/// File name of a saved residual series
pub fn error_filename(estimator: &str, occupancy: f64, slice_size: usize) -> String {
    match estimator {
        "LS" => format!("error_occupancy_{}_slice_{}.csv", occupancy, slice_size),
        other => format!(
            "{}_error_occupancy_{}_slice_{}.csv",
            other.to_lowercase(),
            occupancy,
            slice_size
        ),
    }
}

/// Runs estimators over dataset pairs and reports their residuals
///
/// Holds the configuration, the reporting collaborator and, optionally, a
/// pulse shape already in memory. Cases borrow it immutably, so a sweep can
/// run them from several threads.
pub struct StudyCases {
    config: AnalysisConfig,
    reporter: Box<dyn Reporter>,
    pulse_shape: Option<PulseShape>,
}

impl StudyCases {
    /// Study cases reporting through `reporter`
    pub fn new(config: AnalysisConfig, reporter: Box<dyn Reporter>) -> Self {
        Self {
            config,
            reporter,
            pulse_shape: None,
        }
    }

    /// Use this shape for OF2 instead of loading `filter.pulse_shape_path`
    pub fn with_pulse_shape(mut self, shape: PulseShape) -> Self {
        self.pulse_shape = Some(shape);
        self
    }

    /// Configuration the cases run with
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Case 1: train LS on the training set, evaluate it on the test set
    pub fn run_case_1(&self, provider: &dyn DatasetProvider, occupancy: f64) -> CaloResult<CaseOutcome> {
        let training = provider.training()?;
        let ls = LeastSquares::from_dataset(&training)?;
        let test = provider.test()?;
        self.evaluate(&ls, &test, occupancy)
    }

    /// OF2 built from the reference pulse shape, evaluated on the test set
    pub fn run_of2_case(&self, provider: &dyn DatasetProvider, occupancy: f64) -> CaloResult<CaseOutcome> {
        let of2 = match &self.pulse_shape {
            Some(shape) => Of2::from_pulse_shape(shape, Array1::from(self.config.t_filter()))?,
            None => {
                let shape = PulseShape::from_file(&self.config.filter.pulse_shape_path)?;
                Of2::from_pulse_shape(&shape, Array1::from(self.config.t_filter()))?
            }
        };
        let test = provider.test()?;
        self.evaluate(&of2, &test, occupancy)
    }

    /// Run the configured estimator
    pub fn run(&self, provider: &dyn DatasetProvider, occupancy: f64) -> CaloResult<CaseOutcome> {
        match self.config.filter.estimator {
            EstimatorKind::LeastSquares => self.run_case_1(provider, occupancy),
            EstimatorKind::Of2 => self.run_of2_case(provider, occupancy),
        }
    }

    /// Run the configured estimator for every configured occupancy in parallel
    pub fn sweep<P, F>(&self, make_provider: F) -> Vec<(f64, CaloResult<CaseOutcome>)>
    where
        P: DatasetProvider,
        F: Fn(f64) -> P + Sync,
    {
        info!(
            occupancies = ?self.config.dataset.occupancies,
            estimator = ?self.config.filter.estimator,
            "starting occupancy sweep"
        );

        self.config
            .dataset
            .occupancies
            .par_iter()
            .map(|&occupancy| {
                let provider = make_provider(occupancy);
                (occupancy, self.run(&provider, occupancy))
            })
            .collect()
    }

    /// Sweep over the dataset files in `dataset.data_dir`
    pub fn sweep_files(&self) -> Vec<(f64, CaloResult<CaseOutcome>)> {
        self.sweep(|occupancy| FileDatasetProvider::from_config(&self.config, occupancy))
    }

    fn evaluate(&self, estimator: &dyn Estimator, test: &Dataset, occupancy: f64) -> CaloResult<CaseOutcome> {
        let name = estimator.name();
        let (weights, status): (WeightVector, SolutionStatus) = estimator.go_filtering()?.into();

        if !status.is_feasible() {
            warn!(estimator = name, occupancy, "no feasible solution, skipping case");
            return Ok(CaseOutcome {
                estimator: name,
                occupancy,
                weights,
                status,
                summary: None,
                errors: None,
                saved_to: None,
            });
        }

        let (n_slices, slice_size) = (test.n_slices(), test.slice_size());
        let estimated = estimate_amplitudes(test.samples(), &weights, n_slices, slice_size)?;
        let errors = compare_amplitudes(test.amplitudes(), n_slices, slice_size, &estimated)?;
        let summary = ErrorSummary::from_errors(&errors)?;

        let label = format!("{}_occupancy_{}", name.to_lowercase(), occupancy);
        self.reporter.report(&label, &errors, &summary)?;

        let saved_to = if self.config.output.save_errors {
            let filename = error_filename(name, occupancy, slice_size);
            Some(save_array_to_file(
                &self.config.output.results_dir,
                &filename,
                &errors.to_vec(),
            )?)
        } else {
            None
        };

        info!(
            estimator = name,
            occupancy,
            mean = summary.mean,
            std_dev = summary.std_dev,
            "case finished"
        );

        Ok(CaseOutcome {
            estimator: name,
            occupancy,
            weights,
            status,
            summary: Some(summary),
            errors: Some(errors),
            saved_to,
        })
    }
}

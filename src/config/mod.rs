// src/config/mod.rs
//! Analysis configuration

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};

/// Complete analysis configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct AnalysisConfig {
    /// Estimator selection and window
    #[serde(default)]
    pub filter: FilterConfig,
    /// Dataset layout and location
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Residual statistics
    #[serde(default)]
    pub statistics: StatisticsConfig,
    /// Result persistence
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which estimator produces the weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    /// Optimal filter from the reference pulse shape
    Of2,
    /// Constrained least squares trained on the training set
    LeastSquares,
}

/// Filter construction settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilterConfig {
    /// Estimator run by `StudyCases::run`
    #[serde(default = "defaults::estimator")]
    pub estimator: EstimatorKind,

    /// Window length, odd
    #[serde(default = "defaults::n_filter")]
    pub n_filter: usize,

    /// Spacing of the filter taps, in ns
    #[serde(default = "defaults::sampling_period_ns")]
    pub sampling_period_ns: f64,

    /// Reference pulse shape table used by OF2
    #[serde(default = "defaults::pulse_shape_path")]
    pub pulse_shape_path: String,
}

/// Dataset layout and location
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DatasetConfig {
    /// Slices per dataset
    #[serde(default = "defaults::n_slices")]
    pub n_slices: usize,

    /// Samples per slice, equal to `filter.n_filter`
    #[serde(default = "defaults::slice_size")]
    pub slice_size: usize,

    /// Directory holding `training_occupancy_*.csv` and `test_occupancy_*.csv`
    #[serde(default = "defaults::data_dir")]
    pub data_dir: String,

    /// Occupancies swept by the study cases
    #[serde(default = "defaults::occupancies")]
    pub occupancies: Vec<f64>,
}

/// Error statistics settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StatisticsConfig {
    /// Bins of the residual histogram
    #[serde(default = "defaults::histogram_bins")]
    pub histogram_bins: usize,
}

/// Result persistence settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    /// Write the residual series of each case
    #[serde(default = "defaults::save_errors")]
    pub save_errors: bool,

    /// Destination of residual files
    #[serde(default = "defaults::results_dir")]
    pub results_dir: String,
}

/// Default value providers using constants
mod defaults {
    use super::EstimatorKind;
    use crate::config::constants::*;

    pub fn estimator() -> EstimatorKind { EstimatorKind::LeastSquares }
    pub fn n_filter() -> usize { filter::DEFAULT_N_FILTER }
    pub fn sampling_period_ns() -> f64 { filter::DEFAULT_SAMPLING_PERIOD_NS }
    pub fn pulse_shape_path() -> String { persistence::DEFAULT_PULSE_SHAPE_PATH.to_string() }

    pub fn n_slices() -> usize { dataset::DEFAULT_N_SLICES }
    pub fn slice_size() -> usize { dataset::DEFAULT_SLICE_SIZE }
    pub fn data_dir() -> String { persistence::DEFAULT_DATA_DIR.to_string() }
    pub fn occupancies() -> Vec<f64> { dataset::DEFAULT_OCCUPANCIES.to_vec() }

    pub fn histogram_bins() -> usize { statistics::DEFAULT_HISTOGRAM_BINS }

    pub fn save_errors() -> bool { false }
    pub fn results_dir() -> String { persistence::DEFAULT_RESULTS_DIR.to_string() }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            estimator: defaults::estimator(),
            n_filter: defaults::n_filter(),
            sampling_period_ns: defaults::sampling_period_ns(),
            pulse_shape_path: defaults::pulse_shape_path(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            n_slices: defaults::n_slices(),
            slice_size: defaults::slice_size(),
            data_dir: defaults::data_dir(),
            occupancies: defaults::occupancies(),
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            histogram_bins: defaults::histogram_bins(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_errors: defaults::save_errors(),
            results_dir: defaults::results_dir(),
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let n_filter = self.filter.n_filter;
        if !(filter::MIN_N_FILTER..=filter::MAX_N_FILTER).contains(&n_filter) {
            errors.push(format!(
                "n_filter ({}) must be within [{}, {}]",
                n_filter,
                filter::MIN_N_FILTER,
                filter::MAX_N_FILTER
            ));
        }

        // The filter is applied over whole slices
        if n_filter != self.dataset.slice_size {
            errors.push(format!(
                "n_filter ({}) must equal slice_size ({})",
                n_filter, self.dataset.slice_size
            ));
        }

        // An even window has no centred sample to compare against
        if self.dataset.slice_size % 2 == 0 {
            errors.push(format!(
                "slice_size ({}) must be odd",
                self.dataset.slice_size
            ));
        }

        if self.dataset.n_slices == 0 {
            errors.push("n_slices must be positive".to_string());
        }

        if !(self.filter.sampling_period_ns > 0.0) {
            errors.push(format!(
                "sampling_period_ns ({}) must be positive",
                self.filter.sampling_period_ns
            ));
        }

        if self.statistics.histogram_bins == 0 {
            errors.push("histogram_bins must be positive".to_string());
        }

        if let Some(occ) = self.dataset.occupancies.iter().find(|o| !(0.0..=100.0).contains(*o)) {
            errors.push(format!("occupancy {} must be within [0, 100]", occ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Time offsets of the filter taps, centred on the middle sample
    pub fn t_filter(&self) -> Vec<f64> {
        let half = (self.filter.n_filter / 2) as f64;
        (0..self.filter.n_filter)
            .map(|i| (i as f64 - half) * self.filter.sampling_period_ns)
            .collect()
    }
}

//! calo-core: amplitude reconstruction for sampled calorimeter pulses
//!
//! The crate computes fixed weight vectors that, dot-multiplied with a window
//! of samples, estimate the amplitude of the pulse centred in that window. It
//! features:
//!
//! - OF2 optimal filter built from a reference pulse shape
//! - Constrained least-squares filter trained on sample windows
//! - Sliding amplitude estimation and residual statistics
//! - Layered TOML configuration and study cases over several occupancies
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use calo_core::processing::{estimate_amplitudes, Estimator, Of2};
//! use ndarray::array;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let of2 = Of2::new(
//!         7,
//!         array![-75.0, -50.0, -25.0, 0.0, 25.0, 50.0, 75.0],
//!         array![0.0, 0.0172, 0.4524, 1.0, 0.5633, 0.1493, 0.0424],
//!         array![0.00004019, 0.00333578, 0.03108120, 0.0, -0.02434490, -0.00800683, -0.00243344],
//!     )?;
//!
//!     let output = of2.go_filtering()?;
//!     if let Some(weights) = output.feasible_weights() {
//!         let samples = array![[40.0, 41.0, 58.0, 80.0, 62.0, 46.0, 41.0]];
//!         let amplitudes = estimate_amplitudes(&samples, weights, 1, 7)?;
//!         println!("amplitude: {}", amplitudes[0]);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod cases;
pub mod config;
pub mod dataset;
pub mod error;
pub mod linalg;
pub mod processing;
pub mod pulse_shape;
pub mod report;
pub mod utils;

// Re-export commonly used types for convenience
pub use cases::{CaseOutcome, StudyCases};
pub use config::{AnalysisConfig, ConfigLoader, EstimatorKind};
pub use dataset::{Dataset, DatasetProvider, FileDatasetProvider, InMemoryProvider};
pub use error::{CaloError, CaloResult};
pub use processing::{
    compare_amplitudes, estimate_amplitudes, Estimator, ErrorSummary, FilterOutput, FilterSpec,
    LeastSquares, Of2, SolutionStatus,
};
pub use pulse_shape::PulseShape;
pub use report::{ErrorHistogram, JsonReporter, Reporter, TracingReporter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Amplitude reconstruction for sampled calorimeter pulses".to_string(),
        features: vec![
            "OF2 optimal filter".to_string(),
            "Constrained least-squares filter".to_string(),
            "Sliding amplitude estimation".to_string(),
            "Parallel occupancy sweeps".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}

// src/report.rs
//! Reporting of residual distributions
//!
//! A study case hands its residual series and [`ErrorSummary`] to a
//! [`Reporter`]. The bundled reporters log the histogram through `tracing` or
//! write it as JSON next to the saved error series; plotting is left to
//! external tools reading those files.

use crate::config::constants::statistics::SIGMA_BANDS;
use crate::error::{CaloError, CaloErrorBuilder, CaloResult, IntoCaloError};
use crate::error_context;
use crate::processing::statistics::ErrorSummary;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Interval `mean ± k·σ` and the share of residuals falling inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigmaBand {
    /// `k`
    pub sigmas: u32,
    /// `mean - k·σ`
    pub lower: f64,
    /// `mean + k·σ`
    pub upper: f64,
    /// Share of residuals inside `[lower, upper]`
    pub fraction: f64,
}

/// Equal-width histogram of a residual series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHistogram {
    /// `bins + 1` bin edges
    pub edges: Vec<f64>,
    /// Residuals per bin
    pub counts: Vec<usize>,
    /// Statistics the bands are drawn from
    pub summary: ErrorSummary,
    /// ±1σ, ±2σ and ±3σ bands
    pub bands: Vec<SigmaBand>,
}

impl ErrorHistogram {
    /// Bin `errors` over their range; a constant series gets a unit-wide range
    pub fn build(errors: &Array1<f64>, summary: &ErrorSummary, bins: usize) -> CaloResult<Self> {
        if bins == 0 {
            return Err(CaloErrorBuilder::new("report", "build_histogram")
                .configuration("histogram needs at least one bin"));
        }
        if errors.is_empty() {
            return Err(CaloErrorBuilder::new("report", "build_histogram")
                .shape_mismatch("errors", "non-empty residual series", 0));
        }

        let min = errors.fold(f64::INFINITY, |acc, &v| acc.min(v));
        let max = errors.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        // A constant series still gets a bin of unit width
        let (lower, upper) = if max > min { (min, max) } else { (min - 0.5, min + 0.5) };
        let width = (upper - lower) / bins as f64;

        let edges: Vec<f64> = (0..=bins).map(|i| lower + i as f64 * width).collect();
        let mut counts = vec![0usize; bins];
        for &value in errors.iter() {
            let index = (((value - lower) / width).floor() as usize).min(bins - 1);
            counts[index] += 1;
        }

        let total = errors.len() as f64;
        let bands = SIGMA_BANDS
            .iter()
            .map(|&k| {
                let half_width = k as f64 * summary.std_dev;
                let (lower, upper) = (summary.mean - half_width, summary.mean + half_width);
                let inside = errors.iter().filter(|&&v| v >= lower && v <= upper).count();
                SigmaBand {
                    sigmas: k,
                    lower,
                    upper,
                    fraction: inside as f64 / total,
                }
            })
            .collect();

        Ok(Self {
            edges,
            counts,
            summary: *summary,
            bands,
        })
    }

    /// Residuals counted over all bins
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Pretty-printed JSON document
    pub fn to_json(&self) -> CaloResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CaloError::Configuration {
            reason: format!("histogram serialization failed: {}", e),
            context: error_context!("report", "to_json"),
        })
    }
}

/// Sink for the residuals of a study case
pub trait Reporter: Send + Sync {
    /// Present one residual series under `label`
    fn report(&self, label: &str, errors: &Array1<f64>, summary: &ErrorSummary) -> CaloResult<()>;
}

/// Logs the histogram and its sigma bands at `info` level
#[derive(Debug, Clone)]
pub struct TracingReporter {
    bins: usize,
}

impl TracingReporter {
    /// Reporter binning residuals into `bins` bins
    pub fn new(bins: usize) -> Self {
        Self { bins }
    }
}

impl Reporter for TracingReporter {
    fn report(&self, label: &str, errors: &Array1<f64>, summary: &ErrorSummary) -> CaloResult<()> {
        let histogram = ErrorHistogram::build(errors, summary, self.bins)?;

        info!(
            label,
            count = summary.count,
            mean = summary.mean,
            std_dev = summary.std_dev,
            "residual distribution"
        );
        for band in &histogram.bands {
            info!(
                label,
                sigmas = band.sigmas,
                lower = band.lower,
                upper = band.upper,
                fraction = band.fraction,
                "sigma band"
            );
        }
        Ok(())
    }
}

/// Writes `{label}_histogram.json` into a results directory
#[derive(Debug, Clone)]
pub struct JsonReporter {
    directory: PathBuf,
    bins: usize,
}

impl JsonReporter {
    /// Reporter writing into `directory`
    pub fn new<P: AsRef<Path>>(directory: P, bins: usize) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            bins,
        }
    }

    /// Destination of the report for `label`
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.directory.join(format!("{}_histogram.json", label))
    }
}

impl Reporter for JsonReporter {
    fn report(&self, label: &str, errors: &Array1<f64>, summary: &ErrorSummary) -> CaloResult<()> {
        let histogram = ErrorHistogram::build(errors, summary, self.bins)?;
        let path = self.path_for(label);
        std::fs::write(&path, histogram.to_json()?).calo_err(&path, "report", "write_json")?;

        info!(label, path = %path.display(), "histogram written");
        Ok(())
    }
}

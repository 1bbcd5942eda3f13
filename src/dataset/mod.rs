// src/dataset/mod.rs
//! Sampled pulse datasets
//!
//! A dataset is a continuous record cut into `n_slices` slices of
//! `slice_size` samples. On disk it is a table with one `time, sample,
//! amplitude` row per sample; in memory the three columns are reshaped into
//! `(n_slices, slice_size)` matrices sharing the same layout.

use crate::config::constants::dataset::TABLE_COLUMNS;
use crate::config::AnalysisConfig;
use crate::error::{CaloErrorBuilder, CaloResult};
use crate::utils::array_file::{read_table_from_file, save_table_to_file};
use ndarray::{Array1, Array2, Axis};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Column order of the on-disk table
const TIME_COLUMN: usize = 0;
const SAMPLE_COLUMN: usize = 1;
const AMPLITUDE_COLUMN: usize = 2;

/// Times, samples and true amplitudes of a sliced record
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    times: Array2<f64>,
    samples: Array2<f64>,
    amplitudes: Array2<f64>,
}

impl Dataset {
    /// All three matrices must share one non-empty shape
    pub fn new(times: Array2<f64>, samples: Array2<f64>, amplitudes: Array2<f64>) -> CaloResult<Self> {
        let shape = samples.dim();
        if shape.0 == 0 || shape.1 == 0 {
            return Err(CaloErrorBuilder::new("dataset", "new").shape_mismatch(
                "samples",
                "at least one slice of at least one sample",
                format!("{:?}", shape),
            ));
        }
        for (what, matrix) in [("times", &times), ("amplitudes", &amplitudes)] {
            if matrix.dim() != shape {
                return Err(CaloErrorBuilder::new("dataset", "new").shape_mismatch(
                    what,
                    format!("{:?}", shape),
                    format!("{:?}", matrix.dim()),
                ));
            }
        }

        Ok(Self {
            times,
            samples,
            amplitudes,
        })
    }

    /// Reshape a `(n_slices * slice_size, 3)` table of `time, sample, amplitude` rows
    pub fn from_columns(table: &Array2<f64>, n_slices: usize, slice_size: usize) -> CaloResult<Self> {
        let expected = (n_slices * slice_size, TABLE_COLUMNS);
        if table.dim() != expected || n_slices == 0 || slice_size == 0 {
            return Err(CaloErrorBuilder::new("dataset", "from_columns").shape_mismatch(
                "dataset table",
                format!("{:?}", expected),
                format!("{:?}", table.dim()),
            ));
        }

        let reshape = |column: usize| -> CaloResult<Array2<f64>> {
            let values: Vec<f64> = table.column(column).to_vec();
            Array2::from_shape_vec((n_slices, slice_size), values).map_err(|e| {
                CaloErrorBuilder::new("dataset", "from_columns").shape_mismatch(
                    "dataset column",
                    format!("({}, {})", n_slices, slice_size),
                    e.to_string(),
                )
            })
        };

        Self::new(
            reshape(TIME_COLUMN)?,
            reshape(SAMPLE_COLUMN)?,
            reshape(AMPLITUDE_COLUMN)?,
        )
    }

    /// Inverse of [`Dataset::from_columns`]
    pub fn to_columns(&self) -> Array2<f64> {
        let n = self.samples.len();
        let mut table = Array2::zeros((n, TABLE_COLUMNS));
        for (column, matrix) in [
            (TIME_COLUMN, &self.times),
            (SAMPLE_COLUMN, &self.samples),
            (AMPLITUDE_COLUMN, &self.amplitudes),
        ] {
            table
                .column_mut(column)
                .iter_mut()
                .zip(matrix.iter())
                .for_each(|(dst, src)| *dst = *src);
        }
        table
    }

    /// Sample times, in ns
    pub fn times(&self) -> &Array2<f64> {
        &self.times
    }

    /// Digitised samples, pedestal included
    pub fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    /// True pulse amplitude at every sample position
    pub fn amplitudes(&self) -> &Array2<f64> {
        &self.amplitudes
    }

    /// Number of slices (rows)
    pub fn n_slices(&self) -> usize {
        self.samples.nrows()
    }

    /// Samples per slice (columns)
    pub fn slice_size(&self) -> usize {
        self.samples.ncols()
    }

    /// True amplitude at the centre sample of every slice
    pub fn central_amplitudes(&self) -> Array1<f64> {
        self.amplitudes.index_axis(Axis(1), self.slice_size() / 2).to_owned()
    }
}

/// Source of the training and test datasets of one study
pub trait DatasetProvider: Send + Sync {
    /// Dataset the least-squares filter is trained on
    fn training(&self) -> CaloResult<Dataset>;
    /// Dataset the weights are evaluated on
    fn test(&self) -> CaloResult<Dataset>;
}

/// Datasets already held in memory
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    training: Dataset,
    test: Dataset,
}

impl InMemoryProvider {
    /// Serve `training` and `test` as they are
    pub fn new(training: Dataset, test: Dataset) -> Self {
        Self { training, test }
    }
}

impl DatasetProvider for InMemoryProvider {
    fn training(&self) -> CaloResult<Dataset> {
        Ok(self.training.clone())
    }

    fn test(&self) -> CaloResult<Dataset> {
        Ok(self.test.clone())
    }
}

/// Reads `training_occupancy_{occ}.csv` and `test_occupancy_{occ}.csv`
/// tables from a data directory
#[derive(Debug, Clone)]
pub struct FileDatasetProvider {
    data_dir: PathBuf,
    occupancy: f64,
    n_slices: usize,
    slice_size: usize,
}

impl FileDatasetProvider {
    /// Provider for one occupancy under `data_dir`
    pub fn new<P: AsRef<Path>>(data_dir: P, occupancy: f64, n_slices: usize, slice_size: usize) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            occupancy,
            n_slices,
            slice_size,
        }
    }

    /// Provider for one occupancy of the configured dataset layout
    pub fn from_config(config: &AnalysisConfig, occupancy: f64) -> Self {
        Self::new(
            &config.dataset.data_dir,
            occupancy,
            config.dataset.n_slices,
            config.dataset.slice_size,
        )
    }

    /// `training_occupancy_{occ}.csv`
    pub fn training_filename(&self) -> String {
        format!("training_occupancy_{}.csv", self.occupancy)
    }

    /// `test_occupancy_{occ}.csv`
    pub fn test_filename(&self) -> String {
        format!("test_occupancy_{}.csv", self.occupancy)
    }

    /// Write a dataset where [`FileDatasetProvider::training`] will find it
    pub fn save_training(&self, dataset: &Dataset) -> CaloResult<PathBuf> {
        save_table_to_file(&self.data_dir, &self.training_filename(), &dataset.to_columns())
    }

    /// Write a dataset where [`FileDatasetProvider::test`] will find it
    pub fn save_test(&self, dataset: &Dataset) -> CaloResult<PathBuf> {
        save_table_to_file(&self.data_dir, &self.test_filename(), &dataset.to_columns())
    }

    fn load(&self, filename: &str) -> CaloResult<Dataset> {
        let table = read_table_from_file(&self.data_dir, filename)?;
        debug!(filename, rows = table.nrows(), "dataset table read");
        Dataset::from_columns(&table, self.n_slices, self.slice_size)
    }
}

impl DatasetProvider for FileDatasetProvider {
    fn training(&self) -> CaloResult<Dataset> {
        self.load(&self.training_filename())
    }

    fn test(&self) -> CaloResult<Dataset> {
        self.load(&self.test_filename())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaloError;
    use ndarray::array;
    use tempfile::TempDir;

    fn sample_table() -> Array2<f64> {
        // Two slices of three samples
        array![
            [0.0, 40.0, 0.0],
            [25.0, 41.0, 0.0],
            [50.0, 52.0, 12.0],
            [75.0, 43.0, 0.0],
            [100.0, 44.0, 7.0],
            [125.0, 45.0, 0.0],
        ]
    }

    #[test]
    fn test_from_columns_reshapes_row_major() {
        let dataset = Dataset::from_columns(&sample_table(), 2, 3).unwrap();

        assert_eq!(dataset.n_slices(), 2);
        assert_eq!(dataset.slice_size(), 3);
        assert_eq!(dataset.times(), &array![[0.0, 25.0, 50.0], [75.0, 100.0, 125.0]]);
        assert_eq!(dataset.samples()[[1, 0]], 43.0);
        assert_eq!(dataset.central_amplitudes(), array![0.0, 7.0]);
    }

    #[test]
    fn test_columns_round_trip() {
        let table = sample_table();
        let dataset = Dataset::from_columns(&table, 2, 3).unwrap();
        assert_eq!(dataset.to_columns(), table);
    }

    #[test]
    fn test_from_columns_shape_mismatch() {
        let err = Dataset::from_columns(&sample_table(), 3, 3).unwrap_err();
        assert!(matches!(err, CaloError::ShapeMismatch { what: "dataset table", .. }));

        let narrow = Array2::<f64>::zeros((6, 2));
        assert_eq!(Dataset::from_columns(&narrow, 2, 3).unwrap_err().kind(), "ShapeMismatch");
    }

    #[test]
    fn test_new_rejects_inconsistent_shapes() {
        let err = Dataset::new(Array2::zeros((2, 3)), Array2::zeros((2, 3)), Array2::zeros((3, 2)))
            .unwrap_err();
        assert!(matches!(err, CaloError::ShapeMismatch { what: "amplitudes", .. }));
    }

    #[test]
    fn test_file_provider_round_trip() {
        let dir = TempDir::new().unwrap();
        let provider = FileDatasetProvider::new(dir.path(), 30.0, 2, 3);
        let dataset = Dataset::from_columns(&sample_table(), 2, 3).unwrap();

        let path = provider.save_training(&dataset).unwrap();
        assert!(path.ends_with("training_occupancy_30.csv"));

        assert_eq!(provider.training().unwrap(), dataset);
        assert_eq!(provider.test().unwrap_err().kind(), "NotFound");
    }

    #[test]
    fn test_in_memory_provider() {
        let dataset = Dataset::from_columns(&sample_table(), 2, 3).unwrap();
        let provider = InMemoryProvider::new(dataset.clone(), dataset.clone());

        assert_eq!(provider.training().unwrap(), dataset);
        assert_eq!(provider.test().unwrap().n_slices(), 2);
    }
}

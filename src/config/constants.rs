// src/config/constants.rs
//! System-wide configuration constants

/// Filter construction constants
pub mod filter {
    /// Window length used when none is configured
    pub const DEFAULT_N_FILTER: usize = 7;
    /// Smallest accepted window length
    pub const MIN_N_FILTER: usize = 1;
    /// Largest accepted window length
    pub const MAX_N_FILTER: usize = 64;

    /// Sampling period of the digitiser, in ns (40 MHz bunch crossing)
    pub const DEFAULT_SAMPLING_PERIOD_NS: f64 = 25.0;

    /// Lower bound of a feasible weight
    pub const WEIGHT_MIN: f64 = -1.0;
    /// Upper bound of a feasible weight
    pub const WEIGHT_MAX: f64 = 1.0;

    /// Pedestal rejection: |sum(weights)| must stay below this
    pub const PEDESTAL_SUM_TOLERANCE: f64 = 1e-12;

    // Elementwise |A·x - b| <= SOLVE_ATOL + SOLVE_RTOL * |b|
    /// Relative tolerance of the OF2 residual check
    pub const SOLVE_RTOL: f64 = 1e-5;
    /// Absolute tolerance of the OF2 residual check
    pub const SOLVE_ATOL: f64 = 1e-8;
}

/// Dataset layout constants
pub mod dataset {
    /// Slices per dataset
    pub const DEFAULT_N_SLICES: usize = 1000;
    /// Samples per slice
    pub const DEFAULT_SLICE_SIZE: usize = 7;
    /// Columns of a dataset table: time, sample, amplitude
    pub const TABLE_COLUMNS: usize = 3;
    /// Occupancies swept by the study cases, in percent
    pub const DEFAULT_OCCUPANCIES: &[f64] = &[0.0, 10.0, 30.0, 50.0];
}

/// Statistics and reporting constants
pub mod statistics {
    /// Bins of the residual histogram
    pub const DEFAULT_HISTOGRAM_BINS: usize = 50;
    /// Half widths, in standard deviations, of the reported bands
    pub const SIGMA_BANDS: [u32; 3] = [1, 2, 3];
}

/// Persistence constants
pub mod persistence {
    /// Decimal places written by `save_array_to_file`
    pub const DECIMALS: usize = 4;
    /// Directory holding the dataset tables
    pub const DEFAULT_DATA_DIR: &str = "data";
    /// Directory receiving residual files and reports
    pub const DEFAULT_RESULTS_DIR: &str = "results";
    /// Two-column reference pulse shape table
    pub const DEFAULT_PULSE_SHAPE_PATH: &str = "data/unipolar-pulse-shape.dat";
}

/// File system paths
pub mod paths {
    /// Per-user configuration directory, relative to `$HOME`
    pub const USER_CONFIG_DIR: &str = ".config/calo";
    /// Configuration file in the working directory
    pub const LOCAL_CONFIG_FILE: &str = "calo.toml";
    /// Shipped defaults
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
    /// Prefix of environment overrides
    pub const ENV_PREFIX: &str = "CALO_";
}

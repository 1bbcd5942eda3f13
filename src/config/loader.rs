// src/config/loader.rs
//! Layered configuration loader: defaults, TOML files, then environment

use crate::config::{constants::paths, AnalysisConfig};
use crate::error::{CaloError, CaloResult, IntoCaloError};
use crate::error_context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create new configuration loader
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Create loader with custom paths
    pub fn with_paths(config_paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Use a different prefix for environment overrides
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Load analysis configuration with validation
    pub fn load(&self) -> CaloResult<AnalysisConfig> {
        let config = self.load_and_merge_configs()?;

        config.validate_consistency().map_err(|errors| CaloError::Configuration {
            reason: errors.join("; "),
            context: error_context!("config_loader", "load"),
        })?;

        info!(
            estimator = ?config.filter.estimator,
            n_filter = config.filter.n_filter,
            n_slices = config.dataset.n_slices,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Validate a configuration file without loading it
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> CaloResult<()> {
        let path = path.as_ref();
        let value = self.load_config_file(path)?;
        let config = Self::from_toml_value(path, value)?;

        config.validate_consistency().map_err(|errors| CaloError::Configuration {
            reason: errors.join("; "),
            context: error_context!("config_loader", "validate_config_file"),
        })
    }

    /// Export a configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, config: &AnalysisConfig, path: P) -> CaloResult<()> {
        let path = path.as_ref();
        let toml_content = toml::to_string_pretty(config).map_err(|e| CaloError::Configuration {
            reason: e.to_string(),
            context: error_context!("config_loader", "export_config"),
        })?;

        std::fs::write(path, toml_content).calo_err(path, "config_loader", "export_config")
    }

    fn load_and_merge_configs(&self) -> CaloResult<AnalysisConfig> {
        let mut merged_config = toml::Value::Table(toml::value::Table::new());

        // Start with default configuration
        let default_config =
            toml::Value::try_from(AnalysisConfig::default()).map_err(|e| CaloError::Configuration {
                reason: e.to_string(),
                context: error_context!("config_loader", "load_and_merge_configs"),
            })?;
        Self::merge_toml_values(&mut merged_config, default_config);

        // Later files take precedence
        for config_path in &self.config_paths {
            if !config_path.exists() {
                continue;
            }
            debug!(path = %config_path.display(), "merging configuration file");
            let file_config = self.load_config_file(config_path)?;
            Self::merge_toml_values(&mut merged_config, file_config);
        }

        self.apply_environment_overrides(&mut merged_config);

        Self::from_toml_value(Path::new("<merged>"), merged_config)
    }

    fn load_config_file(&self, path: &Path) -> CaloResult<toml::Value> {
        let content = std::fs::read_to_string(path).calo_err(path, "config_loader", "load_config_file")?;

        toml::from_str(&content).map_err(|e| CaloError::Parse {
            path: path.to_path_buf(),
            line: 0,
            reason: e.to_string(),
            context: error_context!("config_loader", "load_config_file"),
        })
    }

    fn from_toml_value(path: &Path, value: toml::Value) -> CaloResult<AnalysisConfig> {
        value.try_into::<AnalysisConfig>().map_err(|e| CaloError::Parse {
            path: path.to_path_buf(),
            line: 0,
            reason: e.to_string(),
            context: error_context!("config_loader", "from_toml_value"),
        })
    }

    fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        Self::merge_toml_values(base_value, value);
                    } else {
                        base_table.insert(key, value);
                    }
                }
            }
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    /// `CALO_FILTER_N_FILTER=9` sets `filter.n_filter`
    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(stripped) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let lowered = stripped.to_lowercase();
            let Some((section, field)) = lowered.split_once('_') else {
                continue;
            };

            debug!(section, field, "applying environment override");
            Self::set_nested_value(config, section, field, &value);
        }
    }

    fn parse_env_value(value: &str) -> toml::Value {
        if let Ok(int_val) = value.parse::<i64>() {
            toml::Value::Integer(int_val)
        } else if let Ok(float_val) = value.parse::<f64>() {
            toml::Value::Float(float_val)
        } else if let Ok(bool_val) = value.parse::<bool>() {
            toml::Value::Boolean(bool_val)
        } else {
            toml::Value::String(value.to_string())
        }
    }

    fn set_nested_value(config: &mut toml::Value, section: &str, field: &str, raw: &str) {
        let value = Self::parse_env_value(raw);
        if let toml::Value::Table(table) = config {
            let entry = table
                .entry(section.to_string())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
            if let toml::Value::Table(section_table) = entry {
                // The existing value's type wins over the guessed one
                let value = match (section_table.get(field), value) {
                    (Some(toml::Value::Float(_)), toml::Value::Integer(i)) => toml::Value::Float(i as f64),
                    (Some(toml::Value::String(_)), _) => toml::Value::String(raw.to_string()),
                    (_, value) => value,
                };
                section_table.insert(field.to_string(), value);
            }
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut found = Vec::new();

        if let Some(home_dir) = std::env::var_os("HOME").map(PathBuf::from) {
            found.push(home_dir.join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        // Local configurations (in order of precedence)
        found.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        found.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        found
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration for selection runs.
//!
//! Values are layered: built-in defaults, then an optional YAML or JSON file,
//! then `LABEL_FORGE_*` environment variables. CLI flags are applied on top by
//! the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of samples to select.
pub const DEFAULT_QUERY_SIZE: usize = 100;

/// Default number of samples per inference batch.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// The configuration file could not be parsed.
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for a selection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Number of samples to select.
    pub query_size: usize,
    /// Samples per inference call. Affects throughput only.
    pub batch_size: usize,
    /// Seed for the selection draw. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Factor applied to every loaded input value.
    pub input_scale: f32,
    /// File extensions recognised as pool samples.
    pub pool_extensions: Vec<String>,
    /// Root directory of the model registry.
    pub model_root: PathBuf,
    /// Root directory for stored selections.
    pub output_dir: PathBuf,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            query_size: DEFAULT_QUERY_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
            input_scale: 1.0,
            pool_extensions: vec!["json".to_string()],
            model_root: PathBuf::from("./models"),
            output_dir: PathBuf::from("./selections"),
        }
    }
}

impl SelectionConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a YAML or JSON configuration file over the defaults.
    ///
    /// Missing keys keep their default values. The result is not validated,
    /// so later layers can still override out-of-range values; call
    /// [`Self::validate`] once every layer is applied.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self =
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(config)
    }

    /// Creates configuration from defaults and environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LABEL_FORGE_QUERY_SIZE`: Samples to select (default: 100)
    /// - `LABEL_FORGE_BATCH_SIZE`: Inference batch size (default: 32)
    /// - `LABEL_FORGE_SEED`: Selection seed (default: unset)
    /// - `LABEL_FORGE_INPUT_SCALE`: Input scale factor (default: 1.0)
    /// - `LABEL_FORGE_MODEL_ROOT`: Model registry root (default: ./models)
    /// - `LABEL_FORGE_OUTPUT_DIR`: Selection output root (default: ./selections)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from `LABEL_FORGE_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("LABEL_FORGE_QUERY_SIZE") {
            self.query_size = parse_env_value(&val, "LABEL_FORGE_QUERY_SIZE")?;
        }

        if let Ok(val) = std::env::var("LABEL_FORGE_BATCH_SIZE") {
            self.batch_size = parse_env_value(&val, "LABEL_FORGE_BATCH_SIZE")?;
        }

        if let Ok(val) = std::env::var("LABEL_FORGE_SEED") {
            self.seed = Some(parse_env_value(&val, "LABEL_FORGE_SEED")?);
        }

        if let Ok(val) = std::env::var("LABEL_FORGE_INPUT_SCALE") {
            self.input_scale = parse_env_value(&val, "LABEL_FORGE_INPUT_SCALE")?;
        }

        if let Ok(val) = std::env::var("LABEL_FORGE_MODEL_ROOT") {
            self.model_root = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("LABEL_FORGE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "query_size must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if !self.input_scale.is_finite() || self.input_scale <= 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "input_scale must be a positive finite number, got {}",
                self.input_scale
            )));
        }

        if self.pool_extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed(
                "pool_extensions cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Sets the query size.
    pub fn with_query_size(mut self, query_size: usize) -> Self {
        self.query_size = query_size;
        self
    }

    /// Sets the inference batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the selection seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the input scale factor.
    pub fn with_input_scale(mut self, scale: f32) -> Self {
        self.input_scale = scale;
        self
    }

    /// Sets the model registry root.
    pub fn with_model_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.model_root = root.into();
        self
    }

    /// Sets the selection output root.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// Parses an environment variable value into the target type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

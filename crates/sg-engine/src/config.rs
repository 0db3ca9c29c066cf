//! Engine Configuration
//!
//! Loaded from a TOML file, then overridden from `SITEGRAPH_*` environment
//! variables, then validated. Every section and field has a default, so an
//! empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sg_graph::{AttributePredicate, CondenseOptions, default_targets};

use crate::error::ConfigError;

/// Default config file looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "sitegraph.toml";

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SITEGRAPH_";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub processing: ProcessingConfig,
    pub unwrap: UnwrapConfig,
    pub condense: CondenseConfig,
    pub logging: LoggingConfig,
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory scanned for HTML files
    pub input_dir: PathBuf,
    /// Directory receiving snapshots
    pub output_dir: PathBuf,
}

/// Batch decomposition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Maximum number of input files
    pub max_files: usize,
    /// Concurrent document tasks (0 = twice the available cores)
    pub workers: usize,
    /// Commit documents in input order for reproducible node ids
    pub ordered_commit: bool,
    /// File extension of input documents, without the dot
    pub extension: String,
}

/// Wrapper removal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnwrapConfig {
    pub targets: Vec<AttributePredicate>,
}

/// Optional condensation stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CondenseConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub options: CondenseOptions,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/raw_html_data"),
            output_dir: PathBuf::from("data/processed"),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_files: 35_000,
            workers: 0,
            ordered_commit: false,
            extension: "html".to_string(),
        }
    }
}

impl Default for UnwrapConfig {
    fn default() -> Self {
        Self { targets: default_targets() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    /// Load from `path` (or `sitegraph.toml` if present), apply environment
    /// overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Apply `SITEGRAPH_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, dir)) = var("INPUT_DIR") {
            self.paths.input_dir = PathBuf::from(dir);
        }
        if let Some((_, dir)) = var("OUTPUT_DIR") {
            self.paths.output_dir = PathBuf::from(dir);
        }
        if let Some((name, value)) = var("MAX_FILES") {
            self.processing.max_files = value.parse().map_err(|_| ConfigError::Env { var: name, value })?;
        }
        if let Some((name, value)) = var("WORKERS") {
            self.processing.workers = value.parse().map_err(|_| ConfigError::Env { var: name, value })?;
        }
        if let Some((_, level)) = var("LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_files == 0 {
            return Err(ConfigError::Invalid("processing.max_files must be at least 1".into()));
        }
        if self.processing.workers > 1024 {
            return Err(ConfigError::Invalid("Too many workers (maximum 1024)".into()));
        }
        if self.processing.extension.is_empty() || self.processing.extension.starts_with('.') {
            return Err(ConfigError::Invalid("processing.extension must be a bare extension like \"html\"".into()));
        }
        if let Some(i) = self.unwrap.targets.iter().position(AttributePredicate::is_empty) {
            return Err(ConfigError::Invalid(format!("unwrap.targets[{i}] has no attributes")));
        }
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::Invalid(format!("Invalid log level {other:?}"))),
        }
        Ok(())
    }

    /// Number of concurrent document tasks to run
    pub fn worker_count(&self) -> usize {
        if self.processing.workers == 0 {
            let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
            cores * 2
        } else {
            self.processing.workers
        }
    }
}

//! # Configuration System
//!
//! YAML configuration for applications that run many fits with the same
//! settings:
//!
//! - Backend preference and whether to fall back when it is absent
//! - Refinement knobs (grid oversampling, iteration bound, step tolerance)
//! - Location of the native PRESTO library
//! - Logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `PHASEFIT_CONFIG` environment variable
//! 2. `./phasefit.yaml` (current directory)
//! 3. `~/.config/phasefit/config.yaml` (user config)
//! 4. `/etc/phasefit/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! fit:
//!   backend: taylor
//!   fallback: true
//!   upsample: 16
//!
//! native:
//!   library: /opt/presto/lib/libpresto.so
//!
//! logging:
//!   level: debug
//!   format: json
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::{select_backend, BackendKind, FitBackend};
use crate::fit::{FitOptions, DEFAULT_MAX_ITERATIONS, DEFAULT_UPSAMPLE, DEFAULT_XTOL};
use crate::observe::LogConfig;
use crate::types::FitOutcome;

/// Environment variable naming a configuration file explicitly.
pub const CONFIG_ENV: &str = "PHASEFIT_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to read or write the configuration file
    Io(String),
    /// Failed to parse or serialize configuration
    Parse(String),
    /// Invalid configuration value
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config i/o failed: {}", msg),
            ConfigError::Parse(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Fit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Preferred backend (reference, taylor, presto)
    pub backend: BackendKind,
    /// Use the reference backend when the preferred one is absent
    pub fallback: bool,
    /// Oversampling of the coarse correlation grid
    pub upsample: usize,
    /// Bound on refinement iterations
    pub max_iterations: usize,
    /// Refinement step tolerance in turns
    pub xtol: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Reference,
            fallback: true,
            upsample: DEFAULT_UPSAMPLE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            xtol: DEFAULT_XTOL,
        }
    }
}

impl From<&FitConfig> for FitOptions {
    fn from(config: &FitConfig) -> Self {
        FitOptions {
            upsample: config.upsample,
            max_iterations: config.max_iterations,
            xtol: config.xtol,
        }
    }
}

/// Native library configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// Explicit path to PRESTO's shared library
    pub library: Option<PathBuf>,
}

/// Complete phasefit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhasefitConfig {
    /// Configuration version
    pub version: String,
    pub fit: FitConfig,
    pub native: NativeConfig,
    pub logging: LogConfig,
}

impl Default for PhasefitConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            fit: FitConfig::default(),
            native: NativeConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl PhasefitConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the defaults if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Self::load_from(&path);
            }
            tracing::warn!(path = %path.display(), "{} points to a missing file", CONFIG_ENV);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))
    }

    /// Get configuration search paths (excluding the environment override).
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./phasefit.yaml")];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "phasefit") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }
        paths.push(PathBuf::from("/etc/phasefit/config.yaml"));
        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        FitOptions::from(&self.fit)
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if let Some(path) = &self.native.library {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "native.library must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Refinement options from the `fit` section.
    pub fn fit_options(&self) -> FitOptions {
        FitOptions::from(&self.fit)
    }

    /// Register the configured native library path, if any.
    ///
    /// Must run before anything queries backend availability; later calls
    /// have no effect. Returns whether the path was taken.
    pub fn apply_native(&self) -> bool {
        #[cfg(feature = "native")]
        if let Some(path) = &self.native.library {
            return crate::backend::presto_ffi::configure(path);
        }
        false
    }

    /// Construct the configured backend, honouring `fallback`.
    pub fn backend(&self) -> FitOutcome<Box<dyn FitBackend>> {
        self.apply_native();
        select_backend(self.fit.backend, self.fit.fallback, &self.fit_options())
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            fit: FitConfig {
                backend: BackendKind::Taylor,
                upsample: 16,
                ..Default::default()
            },
            native: NativeConfig {
                library: Some(PathBuf::from("/usr/local/lib/libpresto.so")),
            },
            ..Default::default()
        };
        serde_yaml::to_string(&config).unwrap_or_default()
    }
}

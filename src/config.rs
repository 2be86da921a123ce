//! Configuration management for unikmer
//!
//! Settings are layered: built-in defaults, then an optional TOML or JSON
//! file, then `UNIKMER_*` environment variables, then command-line flags.

use crate::error::{Result, UnikmerError};
use crate::logging::{LogLevel, LoggingConfig};
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UnikmerConfig {
    /// Uniqueness index settings
    #[validate(nested)]
    pub index: IndexSettings,

    /// Output settings
    pub output: OutputSettings,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Uniqueness index settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct IndexSettings {
    /// Default window length when `-k` is not given
    #[validate(range(min = 1))]
    pub k: Option<usize>,

    /// Extract k-mers on the rayon thread pool
    pub parallel: bool,

    /// Worker threads for parallel extraction (0 = rayon default)
    #[validate(range(max = 256))]
    pub threads: usize,
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
}

impl UnikmerConfig {
    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: UnikmerConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| UnikmerError::config(format!("TOML parse error: {}", e)))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| UnikmerError::config(format!("JSON parse error: {}", e)))?,
            _ => {
                return Err(UnikmerError::config(
                    "Unsupported config file format. Use .toml or .json",
                ))
            }
        };

        config.check()?;
        Ok(config)
    }

    /// Save configuration to a `.toml` or `.json` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| UnikmerError::config(format!("TOML serialize error: {}", e)))?,
            Some("json") => serde_json::to_string_pretty(self)?,
            _ => {
                return Err(UnikmerError::config(
                    "Unsupported config file format. Use .toml or .json",
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override values from any key lookup using the environment variable names
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(k) = lookup("UNIKMER_K") {
            let k = k
                .parse()
                .map_err(|e| UnikmerError::config(format!("Invalid UNIKMER_K: {}", e)))?;
            self.index.k = Some(k);
        }

        if let Some(threads) = lookup("UNIKMER_THREADS") {
            self.index.threads = threads
                .parse()
                .map_err(|e| UnikmerError::config(format!("Invalid UNIKMER_THREADS: {}", e)))?;
        }

        if let Some(parallel) = lookup("UNIKMER_PARALLEL") {
            self.index.parallel = parallel
                .parse()
                .map_err(|e| UnikmerError::config(format!("Invalid UNIKMER_PARALLEL: {}", e)))?;
        }

        if let Some(level) = lookup("UNIKMER_LOG_LEVEL") {
            self.logging.level = level.parse::<LogLevel>()?;
        }

        if let Some(json_logs) = lookup("UNIKMER_JSON_LOGS") {
            self.logging.json_format = json_logs
                .parse()
                .map_err(|e| UnikmerError::config(format!("Invalid UNIKMER_JSON_LOGS: {}", e)))?;
        }

        self.check()
    }

    /// Validate ranges, reported as a config error
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| UnikmerError::config(format!("Configuration validation failed: {}", e)))
    }
}

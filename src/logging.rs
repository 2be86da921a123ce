//! Logging setup for unikmer
//!
//! The binary installs one global tracing subscriber at start-up. Commands
//! that keep a run log (`demo-log`) route their events to a file through a
//! scoped subscriber instead, leaving the global one untouched.

use crate::error::{Result, UnikmerError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = UnikmerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(UnikmerError::config(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level, ignored when `RUST_LOG` is set
    pub level: LogLevel,
    /// Emit structured JSON lines instead of human-readable text
    pub json_format: bool,
}

/// Install the process-wide subscriber; logs go to stderr
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| UnikmerError::config(format!("Failed to initialize logging: {}", e)))
}

/// Run `f` with every tracing event on this thread appended to `path`
pub fn with_run_log<T>(path: &Path, f: impl FnOnce() -> T) -> Result<T> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UnikmerError::config(format!("Invalid run log path: {}", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|e| UnikmerError::config(format!("Failed to open run log: {}", e)))?;

    let subscriber = tracing_subscriber::fmt()
        .with_writer(appender)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .finish();

    Ok(tracing::subscriber::with_default(subscriber, f))
}

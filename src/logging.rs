//! Logger setup for the plugin.
//!
//! Everything in the crate logs through the `log` facade. When the host
//! loads the plugin, [`init`] installs `env_logger` with the configured level
//! unless some logger is already in place (a host may bring its own, and a
//! plugin reload must not panic). `RUST_LOG` still wins over the config.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Log level names accepted in `[logging] level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Case-insensitive; `warning` is accepted for `warn`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" | "none" => Some(LogLevel::Off),
            _ => None,
        }
    }

    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

/// Installs the process logger. Returns `Ok(false)` when a logger was
/// already installed, which is not an error.
pub fn init(config: &LoggingConfig) -> Result<bool> {
    let level = LogLevel::parse(&config.level)
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.to_filter()).parse_default_env();
    if let Some(path) = &config.file {
        let file = open_log_file(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    let installed = builder.try_init().is_ok();
    if installed {
        log::debug!("📝 Logging initialized at level {}", level.as_str());
    }
    Ok(installed)
}

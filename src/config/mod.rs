//! Configuration management for the sub-window plugin
//!
//! Settings are read from a TOML file named by `MULTIWINDOW_CONFIG` when the
//! host loads the plugin. Every section is optional and falls back to the
//! values the native windows have always used.

use crate::command::{Title, MAX_TITLE_LEN};
use crate::render_loop::LoopTiming;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the config file path.
pub const CONFIG_ENV_VAR: &str = "MULTIWINDOW_CONFIG";

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MultiWindowConfig {
    /// Render thread behaviour
    #[serde(default)]
    pub render: RenderConfig,

    /// Initial window placement and naming
    #[serde(default)]
    pub window: WindowConfig,

    /// Log level and optional log file
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Upper bound on how long the render thread sleeps without a
    /// frame-ready signal (milliseconds)
    #[serde(default = "RenderConfig::default_wake_timeout_ms")]
    pub wake_timeout_ms: u64,

    /// Present with vertical sync
    #[serde(default = "RenderConfig::default_vsync")]
    pub vsync: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    /// Initial screen position
    #[serde(default = "WindowConfig::default_position")]
    pub x: i32,
    #[serde(default = "WindowConfig::default_position")]
    pub y: i32,

    /// Title shown until the host sends its own
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,

    /// Prefix of the per-window Win32 class name
    #[serde(default = "WindowConfig::default_class_prefix")]
    pub class_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error or off
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Append log lines to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            wake_timeout_ms: Self::default_wake_timeout_ms(),
            vsync: Self::default_vsync(),
        }
    }
}

impl RenderConfig {
    fn default_wake_timeout_ms() -> u64 {
        200
    }
    fn default_vsync() -> bool {
        true
    }

    pub fn timing(&self) -> LoopTiming {
        LoopTiming {
            wake_timeout: Duration::from_millis(self.wake_timeout_ms),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            x: Self::default_position(),
            y: Self::default_position(),
            title: Self::default_title(),
            class_prefix: Self::default_class_prefix(),
        }
    }
}

impl WindowConfig {
    fn default_position() -> i32 {
        100
    }
    fn default_title() -> String {
        "Init".to_string()
    }
    fn default_class_prefix() -> String {
        "MultiWindowSub".to_string()
    }

    pub fn initial_title(&self) -> Title {
        Title::new(&self.title)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            file: None,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .context("Failed to get HOME environment variable")?;
            Ok(Path::new(&home).join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl MultiWindowConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_home(path.as_ref())?;

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: MultiWindowConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Config named by `MULTIWINDOW_CONFIG`, or the defaults when the variable
    /// is unset or the file cannot be used.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("📄 Loaded config from {}", Path::new(&path).display());
                config
            }
            Err(err) => {
                warn!("⚠️ Ignoring {}: {:#}", CONFIG_ENV_VAR, err);
                Self::default()
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=10_000).contains(&self.render.wake_timeout_ms) {
            anyhow::bail!("Invalid wake_timeout_ms: must be between 1 and 10000");
        }

        if self.window.title.len() > MAX_TITLE_LEN {
            anyhow::bail!("Invalid title: longer than {} bytes", MAX_TITLE_LEN);
        }

        let prefix = &self.window.class_prefix;
        if prefix.is_empty() || prefix.contains('\0') {
            anyhow::bail!("Invalid class_prefix: must be non-empty without NUL");
        }

        crate::logging::LogLevel::parse(&self.logging.level)
            .with_context(|| format!("Invalid log level: {}", self.logging.level))?;

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}


#[cfg(test)]
mod property_tests;

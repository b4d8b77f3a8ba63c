//! TOML-based configuration persistence.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Linux:    `$XDG_CONFIG_HOME/inputhook/config.toml` (or `~/.config/inputhook/`)
//! - Windows:  `%APPDATA%\InputHook\config.toml`
//! - macOS:    `~/Library/Application Support/InputHook/config.toml`
//!
//! ```toml
//! [hook]
//! display_name = ":0"
//! multi_click_ms = 300
//! delivery = "polling"
//! poll_backoff_ms = 1
//!
//! [monitor]
//! log_level = "debug"
//! json = true
//! ```
//!
//! Every field has a serde default, so an absent file, an empty file, and a
//! file written by an older version all load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::engine::EngineSettings;
use crate::application::provider::DeliveryMode;

/// Largest accepted polling backoff.
pub const MAX_POLL_BACKOFF_MS: u64 = 1_000;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub hook: HookConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Which worker loop the native provider runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    #[default]
    Blocking,
    Polling,
}

/// Hook engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookConfig {
    /// X display to record; absent uses `$DISPLAY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Multi-click interval; absent asks the desktop, falling back to 200 ms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_click_ms: Option<u64>,
    #[serde(default)]
    pub delivery: DeliveryKind,
    /// Sleep between polling iterations; absent spins.  Ignored when blocking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_backoff_ms: Option<u64>,
}

/// Settings for the `inputhook-monitor` binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitorConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Print events as JSON lines instead of log records.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Rejects values the engine cannot use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hook.multi_click_ms == Some(0) {
            return Err(ConfigError::Invalid("hook.multi_click_ms must be positive".into()));
        }
        if let Some(backoff) = self.hook.poll_backoff_ms {
            if backoff > MAX_POLL_BACKOFF_MS {
                return Err(ConfigError::Invalid(format!(
                    "hook.poll_backoff_ms must be at most {MAX_POLL_BACKOFF_MS}, got {backoff}"
                )));
            }
        }
        Ok(())
    }
}

impl HookConfig {
    pub fn delivery_mode(&self) -> DeliveryMode {
        match self.delivery {
            DeliveryKind::Blocking => DeliveryMode::Blocking,
            DeliveryKind::Polling => DeliveryMode::Polling {
                backoff: self.poll_backoff_ms.map(Duration::from_millis),
            },
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            display_name: self.display_name.clone(),
            multi_click: self.multi_click_ms.map(Duration::from_millis),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads and validates the config from the platform path, returning
/// defaults if the file does not exist yet.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads and validates the config at `path`, returning defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if a value is out of range.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AppConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    config.validate()?;
    Ok(config)
}

/// Persists `config` to the platform path.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("InputHook"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("inputhook"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("InputHook")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

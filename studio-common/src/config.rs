//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Service configuration read from a TOML file
///
/// Every field is optional in the file; missing tables fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the service database
    pub root_folder: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Listen address (e.g. "127.0.0.1:5780")
    pub bind_address: Option<String>,

    /// Credential for the avatar animation provider
    pub replicate_api_token: Option<String>,

    /// Credential for the summary completion provider
    pub gemini_api_key: Option<String>,

    /// Generation job tuning
    #[serde(default)]
    pub generation: GenerationSettings,
}

/// `[logging]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[generation]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Delay between two polls of the same provider job
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Poll ceiling per item; reaching it without a terminal status is a timeout
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Timeout for a single provider HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Items processed at once within a batch (1 = sequential)
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_items: default_max_concurrent_items(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

// 60 polls * 5s = 5 minutes of wall clock per item
fn default_max_poll_attempts() -> u32 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_items() -> usize {
    1
}

/// Load a TOML config file
///
/// A missing file yields the default configuration; a file that exists but
/// cannot be parsed is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Default config file location for a module: `<config dir>/studio/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("studio").join(format!("{}.toml", module_name)))
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    get_default_root_folder()
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/studio (or /var/lib/studio for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("studio"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/studio"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("studio"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/studio"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("studio"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\studio"))
    } else {
        PathBuf::from("./studio_data")
    }
}

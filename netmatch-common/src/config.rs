//! Configuration loading and data folder resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the data folder
pub const DATA_FOLDER_ENV: &str = "NETMATCH_DATA_FOLDER";

/// Environment variable naming the TOML config file
pub const CONFIG_FILE_ENV: &str = "NETMATCH_CONFIG";

/// TOML configuration file contents
///
/// Every field is optional; absent values fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the submission snapshot
    pub data_folder: Option<PathBuf>,
    /// Address the HTTP server binds to
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub logging: LoggingConfig,
    pub scorer: ScorerConfig,
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter level when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[scorer]` table: how to launch the external scoring unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Executable to run (e.g. "python")
    pub program: Option<String>,
    /// Arguments placed before `--action` (e.g. the script path)
    pub args: Option<Vec<String>>,
    /// Working directory for the scoring unit
    pub working_dir: Option<PathBuf>,
    /// Seconds before a running invocation is killed
    pub timeout_secs: Option<u64>,
    /// Upper bound on concurrently running invocations
    pub max_concurrent: Option<usize>,
}

/// Default configuration file path for the platform
///
/// `~/.config/netmatch/config.toml` on Linux, the platform config dir elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("netmatch").join("config.toml"))
}

/// Load a TOML config file
///
/// A missing file is not an error: a warning is logged and defaults are
/// returned. A file that exists but cannot be read or parsed is a
/// configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Resolve the config file location: CLI, then environment, then default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    default_config_path()
}

/// Resolve the data folder following the four-tier priority order
pub fn resolve_data_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.data_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/netmatch (or /var/lib/netmatch for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("netmatch"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/netmatch"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("netmatch"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/netmatch"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("netmatch"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\netmatch"))
    } else {
        PathBuf::from("./netmatch_data")
    }
}

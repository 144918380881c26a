//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`RECLAIM_ROOT_FOLDER`)
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Upstream source definitions (catalog and back-end instances) live in the same TOML
//! file. A missing or unreadable file is not fatal: callers get defaults and a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "RECLAIM_ROOT_FOLDER";

/// Environment variable overriding the catalog API key
pub const CATALOG_API_KEY_ENV: &str = "RECLAIM_CATALOG_API_KEY";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "reclaim.db";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "reclaim_sync=debug"
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

fn default_enabled() -> bool {
    true
}

/// Media catalog (Emby) connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Display name, used as the persisted `source` for unmatched items
    pub name: String,
    /// Base URL, e.g. `http://emby.local:8096`
    pub url: String,
    /// API token sent as `X-Emby-Token`
    #[serde(default)]
    pub api_key: String,
    /// Optional user scope for item enumeration
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Library back-end (Sonarr or Radarr) connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Instance name, used as the persisted `source` for matched items
    pub name: String,
    /// Base URL, e.g. `http://sonarr.local:8989`
    pub url: String,
    /// API key sent as `X-Api-Key`
    pub api_key: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Root folders counted for folder space; empty means all of them
    #[serde(default)]
    pub selected_folders: Vec<String>,
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database
    #[serde(default)]
    pub root_folder: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Media catalog
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,

    /// Series back-end instances
    #[serde(default)]
    pub series_backends: Vec<BackendConfig>,

    /// Movie back-end instances
    #[serde(default)]
    pub movie_backends: Vec<BackendConfig>,

    /// Cap on catalog items processed per run (testing aid)
    #[serde(default)]
    pub item_limit: Option<usize>,

    /// Timeout for activity-log queries, seconds
    #[serde(default)]
    pub playback_timeout_secs: Option<u64>,
}

impl TomlConfig {
    /// Catalog, if configured and enabled
    pub fn enabled_catalog(&self) -> Option<&CatalogConfig> {
        self.catalog.as_ref().filter(|c| c.enabled)
    }

    pub fn enabled_series_backends(&self) -> impl Iterator<Item = &BackendConfig> {
        self.series_backends.iter().filter(|b| b.enabled)
    }

    pub fn enabled_movie_backends(&self) -> impl Iterator<Item = &BackendConfig> {
        self.movie_backends.iter().filter(|b| b.enabled)
    }

    /// Apply environment overrides (API keys)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(CATALOG_API_KEY_ENV) {
            if let Some(catalog) = self.catalog.as_mut() {
                if !key.trim().is_empty() {
                    info!("Catalog API key loaded from environment variable");
                    catalog.api_key = key;
                }
            }
        }
    }
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: Option<&TomlConfig>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(root) = toml_config.and_then(|c| c.root_folder.as_deref()) {
        return PathBuf::from(root);
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // ~/.config/reclaim/config.toml first, then /etc/reclaim/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("reclaim").join("config.toml"));
        let system_config = PathBuf::from("/etc/reclaim/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        dirs::config_dir()
            .map(|d| d.join("reclaim").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("reclaim"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/reclaim"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("reclaim"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/reclaim"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("reclaim"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\reclaim"))
    } else {
        PathBuf::from("./reclaim_data")
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load the config file, degrading to defaults when it is missing or invalid
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let resolved = match path {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_path(),
    };

    let mut config = match resolved {
        Ok(p) => match load_toml_config(&p) {
            Ok(config) => {
                info!("Loaded configuration from {}", p.display());
                config
            }
            Err(e) => {
                warn!("{}; using defaults", e);
                TomlConfig::default()
            }
        },
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    };

    config.apply_env_overrides();
    config
}

/// Write a TOML config file (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

//! Persisted defaults for the pfctl and device paths
//!
//! `config.json` in the config directory supplies the paths used to build a
//! [`Firewall`](crate::core::pf::Firewall). Environment variables override the
//! file:
//!
//! - `PFKIT_PFCTL`: path to pfctl
//! - `PFKIT_DEVICE`: path to the pf device

use crate::core::pf::{DEFAULT_CONTROL_PATH, DEFAULT_DEVICE_PATH};
use crate::utils::get_config_dir;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONTROL_PATH_ENV: &str = "PFKIT_PFCTL";
pub const DEVICE_PATH_ENV: &str = "PFKIT_DEVICE";

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PfConfig {
    #[serde(default = "default_control_path")]
    pub control_path: PathBuf,
    #[serde(default = "default_device_path")]
    pub device_path: PathBuf,
}

impl Default for PfConfig {
    fn default() -> Self {
        Self {
            control_path: default_control_path(),
            device_path: default_device_path(),
        }
    }
}

fn default_control_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONTROL_PATH)
}

fn default_device_path() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICE_PATH)
}

impl PfConfig {
    /// Replaces paths with `PFKIT_PFCTL` / `PFKIT_DEVICE` when set and non-empty
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(path) = std::env::var_os(CONTROL_PATH_ENV).filter(|v| !v.is_empty()) {
            self.control_path = PathBuf::from(path);
        }
        if let Some(path) = std::env::var_os(DEVICE_PATH_ENV).filter(|v| !v.is_empty()) {
            self.device_path = PathBuf::from(path);
        }
        self
    }
}

/// Reads a config file, falling back to defaults when it is missing or invalid.
pub fn load_config_from(path: &Path) -> PfConfig {
    match std::fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("Ignoring invalid config {}: {e}", path.display());
            PfConfig::default()
        }),
        Err(_) => PfConfig::default(),
    }
}

/// Loads the config from the config directory, or returns defaults if not
/// found, then applies environment overrides.
pub fn load_config() -> PfConfig {
    get_config_dir()
        .map(|dir| load_config_from(&dir.join(CONFIG_FILE)))
        .unwrap_or_default()
        .apply_env_overrides()
}

/// Saves a config file using an atomic write pattern.
/// 1. Writes to a temporary file in the target directory (mode 0600).
/// 2. Flushes it to disk.
/// 3. Atomically renames it over the target path.
///
/// # Errors
///
/// Returns `Err` if the directory is missing or the file cannot be written.
pub fn save_config_to(config: &PfConfig, path: &Path) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let json = serde_json::to_string_pretty(config)?;

    // NamedTempFile is created with mode 0600 on unix
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(json.as_bytes())?;
    file.as_file().sync_all()?;

    file.persist(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save configuration. Free up space and try again.",
            )
        } else {
            e.error
        }
    })?;
    Ok(())
}

/// Saves the config to `config.json` in the config directory.
///
/// # Errors
///
/// Returns `Err` if the config directory cannot be determined or written.
pub fn save_config(config: &PfConfig) -> std::io::Result<()> {
    let dir = get_config_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "Config directory not found")
    })?;
    crate::utils::ensure_dirs()?;
    save_config_to(config, &dir.join(CONFIG_FILE))
}

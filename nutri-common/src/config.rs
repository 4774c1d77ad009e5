//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "NUTRI_ROOT_FOLDER";

/// Environment variable naming the source dataset
pub const DATASET_ENV: &str = "NUTRI_DATASET";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5790";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DATABASE_FILE: &str = "nutritrack.db";
const DATASET_FILE: &str = "data.csv";

/// Contents of `config.toml`
///
/// Every key is optional; a missing or unreadable file is the same as an
/// empty one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub dataset_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub bind_addr: Option<String>,
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load `path`, failing only on malformed content
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load the platform config file, falling back to defaults
    ///
    /// Missing config is not an error. Malformed config logs a warning.
    pub fn load_or_default() -> Self {
        let Ok(path) = config_file_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }
}

/// Root folder resolution, priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(root_folder) = &config.root_folder {
        return root_folder.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Same priority order for the dataset; the fallback is `<root>/data.csv`
pub fn resolve_dataset_path(
    cli_arg: Option<&Path>,
    config: &TomlConfig,
    root: &Path,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(DATASET_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = &config.dataset_path {
        return path.clone();
    }
    root.join(DATASET_FILE)
}

/// Get configuration file path for the platform
///
/// Linux checks `~/.config/nutritrack/config.toml`, then `/etc/nutritrack/config.toml`.
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("nutritrack").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/nutritrack/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/nutritrack (or /var/lib/nutritrack for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("nutritrack"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/nutritrack"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("nutritrack"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/nutritrack"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("nutritrack"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\nutritrack"))
    } else {
        PathBuf::from("./nutritrack_data")
    }
}

/// File locations derived from a resolved root folder
#[derive(Debug, Clone, PartialEq)]
pub struct RootFolder {
    root: PathBuf,
}

impl RootFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

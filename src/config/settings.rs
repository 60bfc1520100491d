//! Application settings and paths.
//!
//! Settings live in `settings.json` under the XDG config directory. Every
//! field has a default, so a missing file or a partial file is fine;
//! command-line flags override whatever is loaded here.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::ScanConfig;
use crate::types::Port;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/h2sweep)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the platform directories for this user.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "h2sweep", "h2sweep")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Port probed when `--port` is not given.
    pub default_port: Port,
    /// Worker count when `--thread` is not given.
    pub default_threads: usize,
    /// Connect and handshake timeout in seconds.
    pub default_timeout_secs: u64,
    /// Addresses generated per run.
    pub default_count: usize,
    /// File name for report lines, relative to the output directory.
    pub results_file: String,
    /// File name for extracted domains, relative to the output directory.
    pub domains_file: String,
    /// Maximum number of queued addresses and buffered report lines.
    pub queue_capacity: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_port: Port::HTTPS,
            default_threads: ScanConfig::DEFAULT_WORKERS,
            default_timeout_secs: ScanConfig::DEFAULT_TIMEOUT.as_secs(),
            default_count: ScanConfig::DEFAULT_COUNT,
            results_file: "results.txt".to_string(),
            domains_file: "domains.txt".to_string(),
            queue_capacity: ScanConfig::DEFAULT_COUNT,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location.
    ///
    /// Falls back to defaults when there is no config directory or no file.
    pub fn load() -> ConfigResult<Self> {
        let file = match Paths::discover() {
            Ok(paths) => paths.settings_file(),
            Err(e) => {
                debug!("using default settings: {}", e);
                return Ok(Self::default());
            }
        };

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the scanner cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_threads == 0 {
            return Err(ConfigError::InvalidValue(
                "default_threads must be at least 1".to_string(),
            ));
        }
        if self.default_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "default_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.default_count == 0 {
            return Err(ConfigError::InvalidValue(
                "default_count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.results_file.trim().is_empty() || self.domains_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "output file names cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

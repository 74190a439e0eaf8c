//! Installer settings.
//!
//! Layering, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. Optional JSON file (`--config` or `STATUSFETCH_CONFIG`)
//! 3. `STATUSFETCH_*` environment overrides
//!
//! The release version is fixed to the installer's own version and has no
//! environment override.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// =============================================================================
// Defaults
// =============================================================================

/// Name of the executable shipped in each release archive.
pub const DEFAULT_BINARY_NAME: &str = "claude-status";

/// GitHub `owner/name` that publishes the releases.
pub const DEFAULT_REPOSITORY: &str = "claude-status/claude-status";

/// Host serving `<repo>/releases/download/...`.
pub const DEFAULT_RELEASE_BASE_URL: &str = "https://github.com";

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "STATUSFETCH_CONFIG";

const REPOSITORY_ENV: &str = "STATUSFETCH_REPOSITORY";
const BASE_URL_ENV: &str = "STATUSFETCH_BASE_URL";
const BIN_DIR_ENV: &str = "STATUSFETCH_BIN_DIR";
const TIMEOUT_ENV: &str = "STATUSFETCH_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_REDIRECTS: usize = 5;

// =============================================================================
// Installer Settings
// =============================================================================

/// Settings for one installer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Executable name inside the archive (without `.exe`).
    pub binary_name: String,

    /// GitHub `owner/name` publishing the releases.
    pub repository: String,

    /// Base URL the release path is appended to.
    pub release_base_url: String,

    /// Release version to install. Always the installer's own version; never
    /// read from a config file or the environment.
    #[serde(skip, default = "installer_version")]
    pub version: String,

    /// Destination directory. Defaults to the directory holding the running
    /// executable.
    pub bin_dir: Option<PathBuf>,

    /// Total time allowed for one HTTP request, body included.
    pub timeout_secs: u64,

    /// Time allowed to establish a connection.
    pub connect_timeout_secs: u64,

    /// Maximum number of redirects followed per download.
    pub max_redirects: usize,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            version: installer_version(),
            bin_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

fn installer_version() -> String {
    crate::VERSION.to_string()
}

impl InstallerConfig {
    /// Loads settings from defaults, an optional JSON file and the process
    /// environment.
    ///
    /// When `path` is `None`, `STATUSFETCH_CONFIG` is consulted. A file that
    /// is named but unreadable or malformed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match file {
            Some(file) => Self::from_file(&file)?,
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Reads a JSON settings file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config at {}", path.display()))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Applies `STATUSFETCH_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(repo) = lookup(REPOSITORY_ENV) {
            self.repository = repo;
        }
        if let Some(base) = lookup(BASE_URL_ENV) {
            self.release_base_url = base;
        }
        if let Some(dir) = lookup(BIN_DIR_ENV) {
            self.bin_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = lookup(TIMEOUT_ENV) {
            self.timeout_secs = secs
                .trim()
                .parse()
                .ok()
                .filter(|&n: &u64| n > 0)
                .with_context(|| {
                    format!("{} must be a positive number of seconds, got '{}'", TIMEOUT_ENV, secs)
                })?;
        }
        Ok(())
    }

    /// Rejects settings that would make every download fail.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.connect_timeout_secs == 0 {
            anyhow::bail!("connect_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Shell command that builds the binary from source.
    pub fn build_from_source_hint(&self) -> String {
        format!(
            "cargo install --git https://github.com/{} {}",
            self.repository.trim_matches('/'),
            self.binary_name
        )
    }
}

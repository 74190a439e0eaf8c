//! Error types for release installation.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::release::types::{ArchiveFormat, PlatformKey};

/// Errors that can occur while resolving, fetching or installing a release.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(
        "Unsupported platform: {key}. Supported platforms: {}",
        format_keys(supported)
    )]
    UnsupportedPlatform {
        key: PlatformKey,
        supported: Vec<PlatformKey>,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Invalid download URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out after {}s", after.as_secs())]
    Timeout { url: String, after: Duration },

    #[error("Download failed with status {status}: {url}")]
    DownloadFailed { status: u16, url: String },

    #[error("Too many redirects (limit {limit}) while fetching {url}")]
    TooManyRedirects { limit: usize, url: String },

    #[error("Failed to extract {format} archive: {reason}")]
    ExtractionFailed {
        format: ArchiveFormat,
        reason: String,
    },

    #[error("Binary '{name}' not found in downloaded archive")]
    BinaryNotInArchive { name: String },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Installation cancelled")]
    Cancelled,
}

impl InstallError {
    /// Wraps an I/O error with the path it happened on.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the failure happened while acquiring the artifact and
    /// should degrade to a stub instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedPlatform { .. } | Self::HttpClient(_) | Self::Cancelled
        )
    }
}

fn format_keys(keys: &[PlatformKey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for installer operations.
pub type Result<T> = std::result::Result<T, InstallError>;

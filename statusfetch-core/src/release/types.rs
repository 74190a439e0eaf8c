//! Core types for release installation.
//!
//! This module defines the platform key derived from the host, the release
//! target it resolves to, the archive format of each target, and the
//! descriptor of the artifact to fetch.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};

// ============================================================================
// Platform Key
// ============================================================================

/// Host operating system and CPU architecture, in package-manager naming
/// (`darwin`/`linux`/`win32`, `x64`/`arm64`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformKey {
    pub os: String,
    pub arch: String,
}

impl PlatformKey {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Derives the key for the running host.
    ///
    /// Values without a package-manager spelling are kept verbatim so an
    /// unsupported host can still be reported.
    pub fn host() -> Self {
        Self::from_rust_consts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Maps Rust's `std::env::consts` spellings to package-manager spellings.
    pub fn from_rust_consts(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            "windows" => "win32",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

// ============================================================================
// Release Targets
// ============================================================================

/// Supported `(os, arch) -> target` mapping.
const SUPPORTED_TARGETS: &[(&str, &str, &str)] = &[
    ("darwin", "x64", "x86_64-apple-darwin"),
    ("darwin", "arm64", "aarch64-apple-darwin"),
    ("linux", "x64", "x86_64-unknown-linux-gnu"),
    ("linux", "arm64", "aarch64-unknown-linux-gnu"),
    ("win32", "x64", "x86_64-pc-windows-msvc"),
    ("win32", "arm64", "aarch64-pc-windows-msvc"),
];

/// Canonical release-target identifier used in artifact file names,
/// e.g. `aarch64-apple-darwin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseTarget(String);

impl ReleaseTarget {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the target denotes a windows host.
    pub fn is_windows(&self) -> bool {
        self.0.contains("windows")
    }
}

impl fmt::Display for ReleaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReleaseTarget {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Returns every platform key that resolves to a release target.
pub fn supported_keys() -> Vec<PlatformKey> {
    SUPPORTED_TARGETS
        .iter()
        .map(|(os, arch, _)| PlatformKey::new(*os, *arch))
        .collect()
}

/// Resolves a platform key to its release target.
///
/// # Errors
///
/// Returns [`InstallError::UnsupportedPlatform`] for keys outside the
/// supported set; the error lists every supported key.
pub fn resolve(key: &PlatformKey) -> Result<ReleaseTarget> {
    SUPPORTED_TARGETS
        .iter()
        .find(|(os, arch, _)| *os == key.os && *arch == key.arch)
        .map(|(_, _, target)| ReleaseTarget::from(*target))
        .ok_or_else(|| InstallError::UnsupportedPlatform {
            key: key.clone(),
            supported: supported_keys(),
        })
}

// ============================================================================
// Archive Format
// ============================================================================

/// Archive format of a release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive (.tar.gz)
    TarGz,
    /// ZIP archive (.zip)
    Zip,
}

impl ArchiveFormat {
    /// Windows targets ship as zip, everything else as tar.gz.
    pub fn for_target(target: &ReleaseTarget) -> Self {
        if target.is_windows() {
            Self::Zip
        } else {
            Self::TarGz
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ============================================================================
// Artifact Descriptor
// ============================================================================

/// Everything needed to fetch one release artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Version without the leading `v`.
    pub version: String,
    pub target: ReleaseTarget,
    pub archive_format: ArchiveFormat,
    pub url: String,
}

impl ArtifactDescriptor {
    /// Builds the descriptor for `target` from the configured repository,
    /// binary name and version.
    ///
    /// The URL always points at the `v<version>` release tag:
    /// `<base>/<repo>/releases/download/v<version>/<bin>-v<version>-<target>.<ext>`.
    pub fn for_target(config: &InstallerConfig, target: &ReleaseTarget) -> Result<Self> {
        let version = config.version.trim_start_matches('v').to_string();
        let archive_format = ArchiveFormat::for_target(target);
        let url = release_url(config, target);

        url::Url::parse(&url).map_err(|e| InstallError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            version,
            target: target.clone(),
            archive_format,
            url,
        })
    }
}

/// Formats the release URL for `target` without validating it.
pub fn release_url(config: &InstallerConfig, target: &ReleaseTarget) -> String {
    let version = config.version.trim_start_matches('v');
    format!(
        "{base}/{repo}/releases/download/v{version}/{bin}-v{version}-{target}.{ext}",
        base = config.release_base_url.trim_end_matches('/'),
        repo = config.repository.trim_matches('/'),
        bin = config.binary_name,
        ext = ArchiveFormat::for_target(target).extension(),
    )
}

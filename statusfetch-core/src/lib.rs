//! Statusfetch Core Library
//!
//! This crate installs and launches the prebuilt `claude-status` binary. It
//! includes:
//!
//! - Platform resolution to a release target
//! - Release download with redirect handling and in-process extraction
//! - Stub fallback when the release cannot be fetched
//! - Launching the installed binary
//! - Configuration management (defaults, JSON file, environment)

pub mod config;
pub mod error;
pub mod launcher;
pub mod release;

// Re-exports for convenience
pub use config::InstallerConfig;
pub use error::{InstallError, Result};
pub use launcher::{find_installed, launch, LaunchError};
pub use release::{
    resolve, InstallEvent, InstallKind, InstalledBinary, Installer, PlatformKey, ReleaseTarget,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Install path resolution.
//!
//! The binary lands in the package's `bin/` directory:
//!
//! - Linux/macOS: `<bin>/claude-status`
//! - Windows: `<bin>/claude-status.exe` (stub: `<bin>/claude-status.cmd`)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::types::ReleaseTarget;

/// Prefix of the per-run staging directory created inside the bin dir.
pub const STAGING_PREFIX: &str = ".statusfetch-staging-";

/// Returns the directory holding the running executable.
///
/// This is the package's `bin/` directory when installed through a package
/// manager.
pub fn default_bin_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to determine current executable path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("Executable has no parent directory: {}", exe.display()))
}

/// File name of the real binary for `target`.
pub fn binary_file_name(binary_name: &str, target: &ReleaseTarget) -> String {
    if target.is_windows() {
        format!("{}.exe", binary_name)
    } else {
        binary_name.to_string()
    }
}

/// Path of the real binary for `target`.
pub fn binary_path(bin_dir: &Path, binary_name: &str, target: &ReleaseTarget) -> PathBuf {
    bin_dir.join(binary_file_name(binary_name, target))
}

/// Path the fallback stub is written to.
///
/// Windows shells cannot run a script named `.exe`, so the stub gets a
/// `.cmd` sibling there; elsewhere it occupies the binary path itself.
pub fn stub_path(bin_dir: &Path, binary_name: &str, target: &ReleaseTarget) -> PathBuf {
    if target.is_windows() {
        bin_dir.join(format!("{}.cmd", binary_name))
    } else {
        binary_path(bin_dir, binary_name, target)
    }
}

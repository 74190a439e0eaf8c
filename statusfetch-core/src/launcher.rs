//! Runs the installed binary with inherited stdio.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::release::paths;
use crate::release::types::ReleaseTarget;

/// Errors raised before the binary gets to run.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("binary not found, try reinstalling")]
    NotFound { path: PathBuf },

    #[error("{0}")]
    Spawn(#[source] std::io::Error),
}

/// Returns the launchable file for `target` in `bin_dir`.
///
/// Prefers the real binary; on windows targets falls back to the `.cmd`
/// stub. Returns `None` if neither exists.
pub fn find_installed(bin_dir: &Path, binary_name: &str, target: &ReleaseTarget) -> Option<PathBuf> {
    let binary = paths::binary_path(bin_dir, binary_name, target);
    if binary.is_file() {
        return Some(binary);
    }

    let stub = paths::stub_path(bin_dir, binary_name, target);
    stub.is_file().then_some(stub)
}

/// Runs `binary` with `args` and waits for it to exit.
///
/// Returns the child's exit code; a child killed by a signal reports 1.
pub async fn launch(binary: &Path, args: &[OsString]) -> Result<i32, LaunchError> {
    debug!("Launching {} with {} argument(s)", binary.display(), args.len());

    let status = Command::new(binary)
        .args(args)
        .status()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LaunchError::NotFound {
                path: binary.to_path_buf(),
            },
            _ => LaunchError::Spawn(e),
        })?;

    debug!("{} exited with {}", binary.display(), status);
    Ok(status.code().unwrap_or(1))
}

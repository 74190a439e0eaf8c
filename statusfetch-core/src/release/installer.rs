//! Installer coordinating download, extraction and stub fallback.
//!
//! `Installer` is the main entry point for putting the release binary in
//! place. Acquisition failures degrade to a stub script; only cancellation,
//! unsupported hosts and filesystem errors outside acquisition propagate.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::downloader::{DownloadProgress, Downloader};
use super::extractor::{extract_archive_bytes, find_executable, make_executable};
use super::paths;
use super::stub::{self, StubGuidance};
use super::types::{release_url, ArchiveFormat, ArtifactDescriptor, ReleaseTarget};
use crate::config::InstallerConfig;
use crate::error::{InstallError, Result};

// ============================================================================
// Install State
// ============================================================================

/// Per-run installer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotStarted,
    CheckingExisting,
    AlreadyInstalled,
    Downloading,
    Downloaded,
    Extracting,
    Installed,
    DownloadFailed,
    ExtractionFailed,
    StubWritten,
}

impl InstallState {
    /// Returns true for states that end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AlreadyInstalled | Self::Installed | Self::StubWritten
        )
    }
}

/// How the binary at [`InstalledBinary::path`] came to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallKind {
    /// A real binary was already in place; nothing was fetched.
    AlreadyPresent,
    /// Downloaded and extracted during this run.
    Extracted,
    /// Acquisition failed and a stub was written instead.
    Stub { reason: String },
}

/// Outcome of [`Installer::install`].
#[derive(Debug, Clone)]
pub struct InstalledBinary {
    pub path: PathBuf,
    pub kind: InstallKind,
    pub state: InstallState,
    pub history: Vec<InstallState>,
}

impl InstalledBinary {
    pub fn is_stub(&self) -> bool {
        matches!(self.kind, InstallKind::Stub { .. })
    }
}

/// Notifications passed to the install progress callback.
#[derive(Debug, Clone)]
pub enum InstallEvent {
    AlreadyInstalled { path: PathBuf },
    DownloadStarted { url: String },
    Progress(DownloadProgress),
    Downloaded { bytes: usize },
    Extracting { format: ArchiveFormat },
    Installed { path: PathBuf },
    StubWritten { path: PathBuf, guidance: StubGuidance },
}

/// Records state transitions for one run.
struct StateLog {
    current: InstallState,
    history: Vec<InstallState>,
}

impl StateLog {
    fn new() -> Self {
        Self {
            current: InstallState::NotStarted,
            history: vec![InstallState::NotStarted],
        }
    }

    fn advance(&mut self, next: InstallState) {
        debug!("Install state: {:?} -> {:?}", self.current, next);
        self.current = next;
        self.history.push(next);
    }

    fn finish(self, path: PathBuf, kind: InstallKind) -> InstalledBinary {
        InstalledBinary {
            path,
            kind,
            state: self.current,
            history: self.history,
        }
    }
}

// ============================================================================
// Installer
// ============================================================================

/// Installs the release binary for a target into a bin directory.
pub struct Installer {
    config: InstallerConfig,
    bin_dir: PathBuf,
    downloader: Downloader,
    cancel: CancellationToken,
}

impl Installer {
    /// Creates an installer writing into `bin_dir`.
    pub fn new(
        config: InstallerConfig,
        bin_dir: PathBuf,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let downloader = Downloader::new(&config, cancel.clone())?;

        info!(
            "Installer initialized. Bin dir: {}, version: {}",
            bin_dir.display(),
            config.version
        );

        Ok(Self {
            config,
            bin_dir,
            downloader,
            cancel,
        })
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Installs the binary for `target`, reporting progress through
    /// `progress_cb`.
    ///
    /// Returns immediately if a real binary already exists. Download and
    /// extraction failures produce a stub and an `Ok` result.
    ///
    /// # Errors
    ///
    /// - [`InstallError::Cancelled`] if the cancellation token fires.
    /// - [`InstallError::Filesystem`] if the bin directory cannot be created
    ///   or the stub cannot be written.
    pub async fn install<F>(&self, target: &ReleaseTarget, progress_cb: F) -> Result<InstalledBinary>
    where
        F: Fn(InstallEvent) + Send + Sync,
    {
        let mut log = StateLog::new();
        let dest = paths::binary_path(&self.bin_dir, &self.config.binary_name, target);

        log.advance(InstallState::CheckingExisting);
        if dest.is_file() && !stub::is_stub(&dest) {
            info!("{} already installed at {}", self.config.binary_name, dest.display());
            log.advance(InstallState::AlreadyInstalled);
            progress_cb(InstallEvent::AlreadyInstalled { path: dest.clone() });
            return Ok(log.finish(dest, InstallKind::AlreadyPresent));
        }

        tokio::fs::create_dir_all(&self.bin_dir)
            .await
            .map_err(|e| InstallError::filesystem(&self.bin_dir, e))?;

        let outcome = self.acquire(target, &dest, &mut log, &progress_cb).await;
        match outcome {
            Ok(()) => {
                info!(
                    "{} v{} installed to {}",
                    self.config.binary_name,
                    self.config.version.trim_start_matches('v'),
                    dest.display()
                );
                progress_cb(InstallEvent::Installed { path: dest.clone() });
                Ok(log.finish(dest, InstallKind::Extracted))
            }
            Err(e) if e.is_recoverable() => self.fall_back(target, e, log, &progress_cb),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Acquisition
    // ========================================================================

    async fn acquire<F>(
        &self,
        target: &ReleaseTarget,
        dest: &Path,
        log: &mut StateLog,
        progress_cb: &F,
    ) -> Result<()>
    where
        F: Fn(InstallEvent) + Send + Sync,
    {
        log.advance(InstallState::Downloading);
        let descriptor = ArtifactDescriptor::for_target(&self.config, target)?;

        info!("Downloading {} from {}", self.config.binary_name, descriptor.url);
        progress_cb(InstallEvent::DownloadStarted {
            url: descriptor.url.clone(),
        });

        let data = self
            .downloader
            .fetch(&descriptor.url, |p| progress_cb(InstallEvent::Progress(p)))
            .await?;

        log.advance(InstallState::Downloaded);
        progress_cb(InstallEvent::Downloaded { bytes: data.len() });
        self.check_cancelled()?;

        log.advance(InstallState::Extracting);
        progress_cb(InstallEvent::Extracting {
            format: descriptor.archive_format,
        });

        let staging = tempfile::Builder::new()
            .prefix(paths::STAGING_PREFIX)
            .tempdir_in(&self.bin_dir)
            .map_err(|e| InstallError::filesystem(&self.bin_dir, e))?;

        let placed = self.place_from_archive(data, staging.path(), &descriptor, dest).await;

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            warn!(
                "Failed to remove staging directory {}: {}",
                staging_path.display(),
                e
            );
        }

        placed?;
        log.advance(InstallState::Installed);
        Ok(())
    }

    /// Unpacks `data` into `staging`, then moves the binary to `dest`.
    async fn place_from_archive(
        &self,
        data: Vec<u8>,
        staging: &Path,
        descriptor: &ArtifactDescriptor,
        dest: &Path,
    ) -> Result<()> {
        let format = descriptor.archive_format;
        let file_name = paths::binary_file_name(&self.config.binary_name, &descriptor.target);
        let staging_dir = staging.to_path_buf();

        let extracted = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            extract_archive_bytes(&data, &staging_dir, format).map_err(|e| {
                InstallError::ExtractionFailed {
                    format,
                    reason: format!("{:#}", e),
                }
            })?;

            find_executable(&staging_dir, &file_name)
                .ok_or(InstallError::BinaryNotInArchive { name: file_name })
        })
        .await
        .map_err(|e| InstallError::ExtractionFailed {
            format,
            reason: format!("extraction task failed: {}", e),
        })??;

        self.check_cancelled()?;

        if !descriptor.target.is_windows() {
            make_executable(&extracted).map_err(|e| InstallError::Filesystem {
                path: extracted.clone(),
                source: std::io::Error::other(format!("{:#}", e)),
            })?;
        }

        if dest.exists() {
            tokio::fs::remove_file(dest)
                .await
                .map_err(|e| InstallError::filesystem(dest, e))?;
        }
        tokio::fs::rename(&extracted, dest)
            .await
            .map_err(|e| InstallError::filesystem(dest, e))?;

        let stub_path =
            paths::stub_path(&self.bin_dir, &self.config.binary_name, &descriptor.target);
        if stub_path != dest && stub::is_stub(&stub_path) {
            debug!("Removing stale stub {}", stub_path.display());
            tokio::fs::remove_file(&stub_path)
                .await
                .map_err(|e| InstallError::filesystem(&stub_path, e))?;
        }

        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(InstallError::Cancelled)
        } else {
            Ok(())
        }
    }

    // ========================================================================
    // Fallback
    // ========================================================================

    fn fall_back<F>(
        &self,
        target: &ReleaseTarget,
        error: InstallError,
        mut log: StateLog,
        progress_cb: &F,
    ) -> Result<InstalledBinary>
    where
        F: Fn(InstallEvent),
    {
        warn!("Failed to install {}: {}", self.config.binary_name, error);

        if log.current == InstallState::Downloading {
            log.advance(InstallState::DownloadFailed);
        } else {
            log.advance(InstallState::ExtractionFailed);
        }

        let guidance = StubGuidance {
            binary_name: self.config.binary_name.clone(),
            reason: error.to_string(),
            build_hint: self.config.build_from_source_hint(),
            download_url: release_url(&self.config, target),
        };

        let path = paths::stub_path(&self.bin_dir, &self.config.binary_name, target);
        stub::write_stub(&path, &guidance, target.is_windows())?;

        log.advance(InstallState::StubWritten);
        progress_cb(InstallEvent::StubWritten {
            path: path.clone(),
            guidance,
        });

        Ok(log.finish(
            path,
            InstallKind::Stub {
                reason: error.to_string(),
            },
        ))
    }
}

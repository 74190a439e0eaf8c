//! Release acquisition for the prebuilt binary.
//!
//! This module resolves the host to a release target, downloads the matching
//! archive and installs the binary, writing a stub when that fails.
//!
//! # Architecture
//!
//! - `types`: Core types (PlatformKey, ReleaseTarget, ArchiveFormat, ArtifactDescriptor)
//! - `paths`: Install path resolution
//! - `downloader`: HTTP download with redirect cap and progress reporting
//! - `extractor`: In-memory archive extraction (zip, tar.gz)
//! - `stub`: Fallback script written on failure
//! - `installer`: High-level install flow
//!
//! # Example
//!
//! ```ignore
//! use statusfetch_core::release::{resolve, Installer, PlatformKey};
//!
//! let target = resolve(&PlatformKey::host())?;
//! let installer = Installer::new(config, bin_dir, cancel)?;
//!
//! let installed = installer.install(&target, |event| {
//!     if let InstallEvent::Progress(p) = event {
//!         println!("{} bytes", p.bytes_downloaded);
//!     }
//! }).await?;
//! println!("Installed at: {}", installed.path.display());
//! ```

pub mod downloader;
pub mod extractor;
pub mod installer;
pub mod paths;
pub mod stub;
pub mod types;

// Re-export commonly used types
pub use downloader::{DownloadProgress, Downloader};
pub use installer::{InstallEvent, InstallKind, InstallState, InstalledBinary, Installer};
pub use paths::{binary_path, default_bin_dir, stub_path};
pub use stub::{is_stub, StubGuidance};
pub use types::{
    release_url, resolve, supported_keys, ArchiveFormat, ArtifactDescriptor, PlatformKey,
    ReleaseTarget,
};

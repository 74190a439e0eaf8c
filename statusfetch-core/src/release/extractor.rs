//! Archive extraction for downloaded release artifacts.
//!
//! Archives are unpacked from memory (zip, tar.gz) into a staging
//! directory. Entries that would land outside the destination are skipped.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use super::types::ArchiveFormat;

// ============================================================================
// Archive Extraction
// ============================================================================

/// Extracts an in-memory archive into `dest_dir`.
///
/// # Errors
///
/// Returns an error if the archive is corrupt or an entry cannot be written.
pub fn extract_archive_bytes(data: &[u8], dest_dir: &Path, format: ArchiveFormat) -> Result<()> {
    info!(
        "Extracting {} archive ({} bytes) to {}",
        format,
        data.len(),
        dest_dir.display()
    );

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    match format {
        ArchiveFormat::Zip => extract_zip(data, dest_dir),
        ArchiveFormat::TarGz => extract_tar(flate2::read::GzDecoder::new(data), dest_dir),
    }
}

// ============================================================================
// ZIP Extraction
// ============================================================================

fn extract_zip(data: &[u8], dest_dir: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).context("Failed to read zip")?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read zip entry {}", i))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                warn!("Skipping unsafe path in zip: {}", entry.name());
                continue;
            }
        };

        let dest_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&dest_path)
            .with_context(|| format!("Failed to create: {}", dest_path.display()))?;
        io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to write: {}", dest_path.display()))?;
    }

    debug!("ZIP extraction complete");
    Ok(())
}

// ============================================================================
// TAR Extraction
// ============================================================================

fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    for entry_result in archive.entries().context("Failed to read tar")? {
        let mut entry = entry_result.context("Failed to read tar entry")?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            warn!("Skipping link entry in tar archive");
            continue;
        }

        let path = entry.path()?.into_owned();
        if !is_enclosed(&path) {
            warn!("Skipping unsafe path in tar: {}", path.display());
            continue;
        }

        let dest_path = dest_dir.join(&path);

        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&dest_path)
                .with_context(|| format!("Failed to create: {}", dest_path.display()))?;
            io::copy(&mut entry, &mut outfile)
                .with_context(|| format!("Failed to write: {}", dest_path.display()))?;
            outfile.flush()?;
        }
    }

    debug!("TAR extraction complete");
    Ok(())
}

/// Relative path with no `..`, root or prefix components.
fn is_enclosed(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// ============================================================================
// Locating The Binary
// ============================================================================

/// Finds a regular file named `file_name` anywhere under `dir`.
///
/// Shallower matches win, so `bin/tool` beats `docs/examples/tool`.
pub fn find_executable(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut pending = vec![dir.to_path_buf()];

    while !pending.is_empty() {
        let mut next = Vec::new();

        for current in pending {
            let Ok(entries) = fs::read_dir(&current) else {
                continue;
            };

            let mut entries: Vec<_> = entries.flatten().collect();
            entries.sort_by_key(|e| e.file_name());

            for entry in entries {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                let path = entry.path();

                if file_type.is_file() && entry.file_name() == file_name {
                    debug!("Found {} at {}", file_name, path.display());
                    return Some(path);
                }
                if file_type.is_dir() {
                    next.push(path);
                }
            }
        }

        pending = next;
    }

    None
}

// ============================================================================
// Unix Permissions
// ============================================================================

/// Sets mode `0755` on `path` (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).with_context(|| {
            format!("Failed to set executable permission on {}", path.display())
        })?;

        debug!("Set mode 0755 on {}", path.display());
    }

    Ok(())
}

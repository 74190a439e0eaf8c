//! Fallback stub written when the real binary cannot be acquired.
//!
//! The stub is a tiny script that explains the failure on stderr and exits
//! with status 1. It carries a marker line so later runs can tell it apart
//! from a real install and retry the download.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use super::extractor::make_executable;
use crate::error::{InstallError, Result};

/// Bytes inspected when looking for the marker.
const MARKER_SCAN_BYTES: u64 = 256;

/// Line present in every stub script.
pub const STUB_MARKER: &str = "statusfetch-stub";

/// Text a stub prints before exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubGuidance {
    pub binary_name: String,
    pub reason: String,
    pub build_hint: String,
    pub download_url: String,
}

impl StubGuidance {
    /// Lines printed to stderr, in order.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("{} could not be installed: {}", self.binary_name, self.reason),
            "To fix this, either build it from source:".to_string(),
            format!("  {}", self.build_hint),
            "or download the release archive manually:".to_string(),
            format!("  {}", self.download_url),
        ]
    }
}

/// Writes a stub to `path`, replacing whatever is there.
///
/// `windows` selects a `.cmd` batch script; otherwise a `/bin/sh` script
/// with mode 0755 is written.
pub fn write_stub(path: &Path, guidance: &StubGuidance, windows: bool) -> Result<()> {
    let script = if windows {
        render_cmd(guidance)
    } else {
        render_sh(guidance)
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| InstallError::filesystem(parent, e))?;
    }

    fs::write(path, script).map_err(|e| InstallError::filesystem(path, e))?;

    if !windows {
        make_executable(path).map_err(|e| InstallError::Filesystem {
            path: path.to_path_buf(),
            source: std::io::Error::other(format!("{:#}", e)),
        })?;
    }

    info!("Wrote fallback stub to {}", path.display());
    Ok(())
}

/// Returns true if `path` is a stub written by [`write_stub`].
///
/// Only the first few hundred bytes are inspected; real binaries never
/// carry the marker there.
pub fn is_stub(path: &Path) -> bool {
    let mut head = Vec::new();
    let read = File::open(path)
        .and_then(|file| file.take(MARKER_SCAN_BYTES).read_to_end(&mut head));
    if read.is_err() {
        return false;
    }

    let found = String::from_utf8_lossy(&head)
        .lines()
        .any(|line| line.contains(STUB_MARKER));

    if found {
        debug!("{} is a fallback stub", path.display());
    }
    found
}

// ============================================================================
// Script Rendering
// ============================================================================

fn render_sh(guidance: &StubGuidance) -> String {
    let mut script = format!("#!/bin/sh\n# {}\n", STUB_MARKER);
    for line in guidance.lines() {
        script.push_str(&format!("echo {} >&2\n", sh_quote(&line)));
    }
    script.push_str("exit 1\n");
    script
}

fn render_cmd(guidance: &StubGuidance) -> String {
    let mut script = format!("@echo off\r\nREM {}\r\n", STUB_MARKER);
    for line in guidance.lines() {
        script.push_str(&format!("echo {} 1>&2\r\n", cmd_escape(&line)));
    }
    script.push_str("exit /b 1\r\n");
    script
}

fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn cmd_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '^' | '&' | '|' | '<' | '>' | '(' | ')' => {
                out.push('^');
                out.push(c);
            }
            '%' => out.push_str("%%"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guidance() -> StubGuidance {
        StubGuidance {
            binary_name: "claude-status".to_string(),
            reason: "Download failed with status 404: https://example.com/a's.tar.gz".to_string(),
            build_hint: "cargo install --git https://github.com/acme/status claude-status"
                .to_string(),
            download_url: "https://example.com/a.tar.gz".to_string(),
        }
    }

    #[test]
    fn test_sh_quote() {
        assert_eq!(sh_quote("plain"), "'plain'");
        assert_eq!(sh_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_cmd_escape() {
        assert_eq!(cmd_escape("a & b"), "a ^& b");
        assert_eq!(cmd_escape("100%"), "100%%");
        assert_eq!(cmd_escape("(x)"), "^(x^)");
    }

    #[test]
    fn test_render_cmd_shape() {
        let script = render_cmd(&guidance());
        assert!(script.starts_with("@echo off\r\n"));
        assert!(script.contains(STUB_MARKER));
        assert!(script.contains("cargo install --git https://github.com/acme/status claude-status"));
        assert!(script.ends_with("exit /b 1\r\n"));
    }

    #[test]
    fn test_write_stub_and_detect() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bin").join("claude-status");

        write_stub(&path, &guidance(), false).unwrap();

        assert!(is_stub(&path));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#!/bin/sh\n"));
    }

    #[test]
    fn test_is_stub_false_for_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("claude-status");
        fs::write(&path, b"\x7fELF\x02\x01\x01 real binary").unwrap();

        assert!(!is_stub(&path));
        assert!(!is_stub(&temp_dir.path().join("missing")));
    }

    #[test]
    fn test_is_stub_ignores_marker_past_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("claude-status");

        let mut content = vec![0u8; 4096];
        content.extend_from_slice(STUB_MARKER.as_bytes());
        fs::write(&path, &content).unwrap();

        assert!(!is_stub(&path));
    }

    #[cfg(unix)]
    #[test]
    fn test_stub_exits_one_with_guidance() {
        use std::os::unix::fs::PermissionsExt;
        use std::process::Command;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("claude-status");
        write_stub(&path, &guidance(), false).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let output = Command::new("sh").arg(&path).output().unwrap();
        assert_eq!(output.status.code(), Some(1));
        assert!(output.stdout.is_empty());

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("could not be installed"), "{stderr}");
        assert!(stderr.contains("a's.tar.gz"), "{stderr}");
        assert!(stderr.contains("cargo install --git"), "{stderr}");
        assert!(stderr.contains("https://example.com/a.tar.gz"), "{stderr}");
    }
}

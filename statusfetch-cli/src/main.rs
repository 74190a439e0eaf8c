//! Statusfetch CLI
//!
//! Installs the prebuilt `claude-status` binary for this host and runs it.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use statusfetch_core::release::{default_bin_dir, paths, ArtifactDescriptor};
use statusfetch_core::{
    find_installed, launch, resolve, InstallEvent, Installer, InstallerConfig,
    LaunchError, PlatformKey,
};

fn main() {
    // Logs go to stderr; stdout carries progress lines only.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    let result = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")
        .and_then(|runtime| runtime.block_on(real_main(cli)));

    std::process::exit(exit_code(result));
}

/// Maps a command outcome to the process exit status. Errors exit 1.
fn exit_code(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("statusfetch: {:#}", e);
            1
        }
    }
}

async fn real_main(cli: Cli) -> Result<i32> {
    tracing::debug!("Starting statusfetch v{}", statusfetch_core::VERSION);

    match cli.command_or_default() {
        Command::Install { bin_dir } => {
            let config = InstallerConfig::load(cli.config.as_deref())?;
            install(config, bin_dir).await
        }
        Command::Run { args } => run(args).await,
        Command::Target => {
            let config = InstallerConfig::load(cli.config.as_deref())?;
            print_target(&config)
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn install(config: InstallerConfig, bin_dir: Option<PathBuf>) -> Result<i32> {
    let bin_dir = resolve_bin_dir(bin_dir, &config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling install");
            ctrl_c.cancel();
        }
    });

    install_for(config, &PlatformKey::host(), bin_dir, cancel).await
}

/// Installs for `key` into `bin_dir`.
///
/// Returns 0 when the binary was installed, was already present, or was
/// replaced by a stub. Unsupported platforms, cancellation and fatal
/// filesystem errors are returned as errors.
async fn install_for(
    config: InstallerConfig,
    key: &PlatformKey,
    bin_dir: PathBuf,
    cancel: CancellationToken,
) -> Result<i32> {
    let target = resolve(key)?;
    let binary_name = config.binary_name.clone();

    let installer = Installer::new(config, bin_dir, cancel)?;
    let installed = installer
        .install(&target, |event| report(&binary_name, event))
        .await?;
    tracing::debug!(
        "Install finished in state {:?} via {:?}",
        installed.state,
        installed.history
    );

    Ok(0)
}

async fn run(args: Vec<OsString>) -> Result<i32> {
    let mut config = InstallerConfig::default();
    config.apply_overrides(|key| std::env::var(key).ok())?;

    let target = resolve(&PlatformKey::host())?;
    let bin_dir = resolve_bin_dir(None, &config)?;

    let binary = match find_installed(&bin_dir, &config.binary_name, &target) {
        Some(binary) => binary,
        None => {
            let path = paths::binary_path(&bin_dir, &config.binary_name, &target);
            eprintln!("{}", LaunchError::NotFound { path });
            return Ok(1);
        }
    };

    match launch(&binary, &args).await {
        Ok(code) => Ok(code),
        Err(e) => {
            eprintln!("{}", e);
            Ok(1)
        }
    }
}

fn print_target(config: &InstallerConfig) -> Result<i32> {
    let key = PlatformKey::host();
    let target = resolve(&key)?;
    let descriptor = ArtifactDescriptor::for_target(config, &target)?;

    println!("platform: {}", key);
    println!("target:   {}", descriptor.target);
    println!("archive:  {}", descriptor.archive_format);
    println!("url:      {}", descriptor.url);
    Ok(0)
}

// ============================================================================
// Helpers
// ============================================================================

/// `--bin-dir` flag, then config, then this executable's directory.
fn resolve_bin_dir(flag: Option<PathBuf>, config: &InstallerConfig) -> Result<PathBuf> {
    match flag.or_else(|| config.bin_dir.clone()) {
        Some(dir) => Ok(dir),
        None => default_bin_dir(),
    }
}

/// Stdout line for an install event, if it has one.
fn progress_line(binary_name: &str, event: &InstallEvent) -> Option<String> {
    match event {
        InstallEvent::AlreadyInstalled { path } => Some(format!(
            "{} is already installed at {}",
            binary_name,
            path.display()
        )),
        InstallEvent::DownloadStarted { url } => {
            Some(format!("Downloading {} from {}", binary_name, url))
        }
        InstallEvent::Downloaded { bytes } => Some(format!("Downloaded {} bytes", bytes)),
        InstallEvent::Installed { path } => Some(format!(
            "{} installed to {}",
            binary_name,
            path.display()
        )),
        _ => None,
    }
}

fn report(binary_name: &str, event: InstallEvent) {
    if let Some(line) = progress_line(binary_name, &event) {
        println!("{}", line);
        return;
    }

    match event {
        InstallEvent::Progress(progress) => {
            if let Some(percent) = progress.percent {
                tracing::debug!("Download progress: {:.1}%", percent);
            }
        }
        InstallEvent::Extracting { format } => tracing::debug!("Extracting {} archive", format),
        InstallEvent::StubWritten { path, guidance } => {
            for line in guidance.lines() {
                eprintln!("{}", line);
            }
            eprintln!("A placeholder was written to {}", path.display());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statusfetch_core::release::is_stub;
    use tempfile::TempDir;

    fn linux_x64() -> PlatformKey {
        PlatformKey::new("linux", "x64")
    }

    fn config(base_url: &str) -> InstallerConfig {
        InstallerConfig {
            repository: "acme/claude-status".to_string(),
            release_base_url: base_url.to_string(),
            timeout_secs: 10,
            ..InstallerConfig::default()
        }
    }

    #[tokio::test]
    async fn install_stub_fallback_exits_zero() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let result = install_for(
            config(&server.url()),
            &linux_x64(),
            temp_dir.path().to_path_buf(),
            CancellationToken::new(),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(exit_code(result), 0);
        assert!(is_stub(&temp_dir.path().join("claude-status")));
    }

    #[tokio::test]
    async fn install_already_present_exits_zero() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("claude-status"), b"\x7fELF real").unwrap();

        let result = install_for(
            config("http://127.0.0.1:9"),
            &linux_x64(),
            temp_dir.path().to_path_buf(),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(exit_code(result), 0);
    }

    #[tokio::test]
    async fn install_unsupported_platform_exits_one() {
        let temp_dir = TempDir::new().unwrap();
        let result = install_for(
            config("http://127.0.0.1:9"),
            &PlatformKey::new("freebsd", "riscv64"),
            temp_dir.path().to_path_buf(),
            CancellationToken::new(),
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Unsupported platform"), "{err}");
        assert_eq!(exit_code(Err(err)), 1);
        assert!(!temp_dir.path().join("claude-status").exists());
    }

    #[tokio::test]
    async fn install_cancelled_exits_one() {
        let temp_dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = install_for(
            config("http://127.0.0.1:9"),
            &linux_x64(),
            temp_dir.path().to_path_buf(),
            cancel,
        )
        .await;

        assert_eq!(exit_code(result), 1);
        assert!(!temp_dir.path().join("claude-status").exists());
    }

    #[tokio::test]
    async fn malformed_config_exits_one() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("statusfetch.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cli = Cli::try_parse_from([
            "statusfetch".into(),
            "install".into(),
            "--config".into(),
            path.into_os_string(),
        ])
        .unwrap();

        assert_eq!(exit_code(real_main(cli).await), 1);
    }

    #[test]
    fn progress_lines_use_configured_binary_name() {
        let line = progress_line(
            "acme-status",
            &InstallEvent::DownloadStarted {
                url: "https://example.com/a.tar.gz".to_string(),
            },
        );
        assert_eq!(
            line.as_deref(),
            Some("Downloading acme-status from https://example.com/a.tar.gz")
        );

        let line = progress_line(
            "acme-status",
            &InstallEvent::Installed {
                path: PathBuf::from("/opt/bin/acme-status"),
            },
        )
        .unwrap();
        assert!(line.starts_with("acme-status installed to"), "{line}");
        assert!(!line.contains("claude-status"), "{line}");
    }

    #[test]
    fn bin_dir_flag_wins_over_config() {
        let config = InstallerConfig {
            bin_dir: Some(PathBuf::from("/from/config")),
            ..InstallerConfig::default()
        };

        assert_eq!(
            resolve_bin_dir(Some(PathBuf::from("/from/flag")), &config).unwrap(),
            PathBuf::from("/from/flag")
        );
        assert_eq!(
            resolve_bin_dir(None, &config).unwrap(),
            PathBuf::from("/from/config")
        );
    }

    #[test]
    fn bin_dir_defaults_to_exe_dir() {
        let dir = resolve_bin_dir(None, &InstallerConfig::default()).unwrap();
        assert_eq!(dir, default_bin_dir().unwrap());
    }
}

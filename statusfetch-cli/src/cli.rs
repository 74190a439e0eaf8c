use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "statusfetch",
    version,
    about = "Installs and runs the prebuilt claude-status binary"
)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Sub-commands (install, run, target)
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download and install the binary for this host (default if no sub-command)
    Install {
        /// Directory to install into (defaults to this executable's directory)
        #[arg(long)]
        bin_dir: Option<PathBuf>,
    },
    /// Run the installed binary, forwarding all arguments
    #[command(disable_help_flag = true)]
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },
    /// Print the release target, archive format and download URL for this host
    Target,
}

impl Cli {
    /// The requested command, defaulting to `install`.
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Install { bin_dir: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_install() {
        let cli = Cli::try_parse_from(["statusfetch"]).unwrap();
        assert_eq!(cli.command_or_default(), Command::Install { bin_dir: None });
    }

    #[test]
    fn install_with_bin_dir_and_config() {
        let cli = Cli::try_parse_from([
            "statusfetch",
            "install",
            "--bin-dir",
            "/opt/status/bin",
            "--config",
            "cfg.json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(
            cli.command_or_default(),
            Command::Install {
                bin_dir: Some(PathBuf::from("/opt/status/bin"))
            }
        );
    }

    #[test]
    fn run_forwards_hyphenated_args() {
        let cli =
            Cli::try_parse_from(["statusfetch", "run", "--format", "json", "-v", "--help"]).unwrap();

        let expected: Vec<OsString> = ["--format", "json", "-v", "--help"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(cli.command, Some(Command::Run { args: expected }));
    }

    #[test]
    fn run_without_args() {
        let cli = Cli::try_parse_from(["statusfetch", "run"]).unwrap();
        assert_eq!(cli.command, Some(Command::Run { args: Vec::new() }));
    }

    #[test]
    fn target_subcommand() {
        let cli = Cli::try_parse_from(["statusfetch", "target"]).unwrap();
        assert_eq!(cli.command, Some(Command::Target));
    }
}

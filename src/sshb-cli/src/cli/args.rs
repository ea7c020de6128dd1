//! Command-line argument structures.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::history_cmd::HistoryCli;

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors (default)
    #[default]
    Warn,
    /// Show informational messages and above
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// sshb - remote sessions with your local shell environment and eternal
/// history.
///
/// With a host argument, opens a remote session: your local rc files are
/// bundled, shipped, and sourced remotely, and every command the remote
/// session runs is relayed back into the local eternal-history log.
#[derive(Debug, Parser)]
#[command(name = "sshb")]
#[command(author, version)]
#[command(about = "Remote sessions with your local shell environment and eternal history")]
#[command(
    subcommand_negates_reqs = true,
    override_usage = "sshb [OPTIONS] [-i IDENTITY_FILE]... HOST [REMOTE_COMMAND]...\n       sshb <COMMAND> [ARGS]"
)]
pub struct Cli {
    /// Identity file, passed through to the ssh client (repeatable)
    #[arg(short = 'i', value_name = "IDENTITY_FILE")]
    pub identity: Vec<PathBuf>,

    /// Log verbosity on stderr
    #[arg(long = "log-level", global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Write trace-level logs to a file
    #[arg(long = "debug-file", global = true, value_name = "PATH")]
    pub debug_file: Option<PathBuf>,

    /// Target host ([user@]host)
    #[arg(value_name = "HOST", required = true)]
    pub host: Option<String>,

    /// Run this command remotely instead of an interactive shell
    #[arg(
        value_name = "REMOTE_COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub remote_command: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Eternal-history maintenance
    History(HistoryCli),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn identity_and_host_are_separated() {
        let cli = Cli::try_parse_from(["sshb", "-i", "/path/to/key", "devbox"]).unwrap();
        assert_eq!(cli.identity, vec![PathBuf::from("/path/to/key")]);
        assert_eq!(cli.host.as_deref(), Some("devbox"));
        assert!(cli.remote_command.is_empty());
    }

    #[test]
    fn repeated_identities_accumulate() {
        let cli = Cli::try_parse_from(["sshb", "-i", "/a", "-i", "/b", "devbox"]).unwrap();
        assert_eq!(cli.identity.len(), 2);
    }

    #[test]
    fn identity_without_value_is_a_parse_error() {
        assert!(Cli::try_parse_from(["sshb", "-i"]).is_err());
    }

    #[test]
    fn missing_host_is_a_parse_error() {
        assert!(Cli::try_parse_from(["sshb"]).is_err());
        assert!(Cli::try_parse_from(["sshb", "-i", "/key"]).is_err());
    }

    #[test]
    fn remote_command_trails_the_host() {
        let cli = Cli::try_parse_from(["sshb", "devbox", "uname", "-a"]).unwrap();
        assert_eq!(cli.host.as_deref(), Some("devbox"));
        assert_eq!(cli.remote_command, vec!["uname", "-a"]);
    }

    #[test]
    fn history_subcommand_needs_no_host() {
        let cli = Cli::try_parse_from(["sshb", "history", "path"]).unwrap();
        assert!(cli.host.is_none());
        assert!(matches!(cli.command, Some(Commands::History(_))));
    }
}

//! Command dispatch.

use anyhow::{Context, Result, bail};

use super::args::{Cli, Commands};
use crate::history_cmd;
use sshb_session::{Session, SshbConfig, run_session};

/// Dispatch a parsed command line; returns the process exit code.
pub async fn dispatch_command(cli: Cli) -> Result<i32> {
    let config = SshbConfig::load().context("loading configuration")?;
    tracing::debug!(history_file = %config.history_file.display(), "configuration loaded");

    if let Some(command) = cli.command {
        match command {
            Commands::History(history) => {
                history_cmd::run_history(&config, history)?;
                return Ok(0);
            }
        }
    }

    let Some(host) = cli.host else {
        // Unreachable through clap (HOST is required when no subcommand is
        // given), kept as a guard for programmatic construction.
        bail!("no host argument supplied");
    };

    let session = Session::new(host, cli.identity, cli.remote_command);
    let code = run_session(&config, &session).await?;
    Ok(code)
}

//! Eternal-history maintenance subcommands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use sshb_common::file_locking::LockConfig;
use sshb_history::{EternalHistory, dedup_history, sync_local_history};
use sshb_session::SshbConfig;

#[derive(Debug, Args)]
pub struct HistoryCli {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommands {
    /// Print the resolved history log path
    Path,

    /// Remove superseded duplicate records from the log
    Dedup {
        /// Seconds to wait for the exclusive file lock
        #[arg(long, default_value_t = 30)]
        lock_timeout: u64,
    },

    /// Merge the local shell history file into the log
    Sync {
        /// History file to merge (defaults to the configured one)
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
}

/// Run a history subcommand.
pub fn run_history(config: &SshbConfig, cli: HistoryCli) -> Result<()> {
    match cli.command {
        HistoryCommands::Path => {
            println!("{}", config.history_file.display());
            Ok(())
        }
        HistoryCommands::Dedup { lock_timeout } => {
            let lock_config = LockConfig::with_timeout(Duration::from_secs(lock_timeout));
            let stats = dedup_history(&config.history_file, &lock_config)
                .with_context(|| format!("deduplicating {}", config.history_file.display()))?;
            println!(
                "{} records scanned, {} duplicates removed",
                stats.total, stats.removed
            );
            Ok(())
        }
        HistoryCommands::Sync { file } => {
            let histfile = file.unwrap_or_else(|| config.local_histfile.clone());
            let log = EternalHistory::new(config.history_file.clone());
            let stats = sync_local_history(&histfile, &log, &local_user_host(), "-")
                .with_context(|| format!("syncing {}", histfile.display()))?;
            println!(
                "{} entries scanned, {} appended, {} suppressed",
                stats.scanned, stats.appended, stats.suppressed
            );
            Ok(())
        }
    }
}

/// `user@host` identity of the local machine for synced records.
fn local_user_host() -> String {
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{user}@{host}")
}

//! Session orchestration: the top-level composition behind the `sshb`
//! entry point.
//!
//! A session resolves its target, builds the environment bundle, opens the
//! control connection, primes the remote side, starts the relay listener,
//! launches the interactive remote shell, and cleans everything up exactly
//! once - on normal return, on setup failure, and on termination signals.

pub mod config;
pub mod runner;
pub mod session;

pub use config::SshbConfig;
pub use runner::{run_session, run_session_with_cancel};
pub use session::Session;

use std::path::PathBuf;
use thiserror::Error;

/// Errors for session orchestration.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bundle construction failed; nothing remote was touched.
    #[error(transparent)]
    Bundle(#[from] sshb_bundle::BundleError),

    /// Control-connection failure.
    #[error(transparent)]
    Control(#[from] sshb_control::ControlError),

    /// Configuration file could not be read or parsed.
    #[error("failed to load config {path}: {detail}")]
    Config { path: PathBuf, detail: String },

    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

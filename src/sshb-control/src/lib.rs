//! Multiplexed SSH control-connection management.
//!
//! One [`ControlConnection`] per session owns a background SSH master with a
//! private control socket, issues every auxiliary remote command over it
//! (host resolution aside, which happens before anything remote is touched),
//! and guarantees teardown exactly once: remote reader killed by tag,
//! explicit `-O exit` disconnect, control directory removed.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized -> ResolvingHost -> Connected -> Primed -> Interactive
//!                                                   \          |
//!                                                    v         v
//!                                                  Closing -> Closed
//! ```
//!
//! One-shot commands go `Connected -> Interactive` directly: nothing is
//! installed remotely, so there is nothing to prime.

pub mod connection;
pub mod host;

pub use connection::{ConnectionState, ControlConnection, ControlOptions};
pub use host::{HostSpec, ResolvedHost};

use thiserror::Error;

/// Errors for control-connection operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// No host argument was supplied.
    #[error("no host argument supplied")]
    MissingHost,

    /// The `[user@]host` specification could not be parsed.
    #[error("invalid host specification: {0:?}")]
    InvalidHostSpec(String),

    /// `ssh -G` failed or produced no canonical hostname.
    #[error("failed to resolve host {host}: {detail}")]
    ResolveFailed { host: String, detail: String },

    /// The background control master could not be established.
    #[error("control master failed to start: {0}")]
    MasterFailed(String),

    /// A remote command over the control connection failed.
    #[error("remote command failed: {0}")]
    RemoteCommand(String),

    /// A command string could not be safely quoted for the remote shell.
    #[error("cannot quote for remote shell: {0:?}")]
    Quoting(String),

    /// Operation attempted in the wrong connection state.
    #[error("connection is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: ConnectionState,
        actual: ConnectionState,
    },

    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for control operations.
pub type Result<T> = std::result::Result<T, ControlError>;

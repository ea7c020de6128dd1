//! Shell environment bundling for sshb remote sessions.
//!
//! This crate produces the single self-contained script that is shipped to
//! the remote host and installed as the interactive shell's rc-file. The
//! script reproduces the local environment (rc file, exports, functions,
//! aliases, completions, concatenated in a fixed order) and prepends a
//! synthetic preamble: an interpreter marker, a remote-session marker
//! variable, and the history-reporting hook that feeds the relay pipe.
//!
//! # Example
//!
//! ```rust,ignore
//! use sshb_bundle::{BundleBuilder, scripts};
//!
//! let preamble = scripts::preamble("alice", "devbox");
//! let (bundle, stats) = BundleBuilder::new(preamble, sources).build().await?;
//! // transmit bundle.path(), then:
//! bundle.remove()?;
//! ```

pub mod builder;
pub mod scripts;

pub use builder::{Bundle, BundleBuilder, BundleStats};
pub use scripts::{remote_pipe_path, remote_script_path};

use thiserror::Error;

/// Errors for bundle construction.
#[derive(Debug, Error)]
pub enum BundleError {
    /// No temp file could be allocated; the session must abort before any
    /// connection is attempted.
    #[error("failed to create bundle temp file: {0}")]
    TempFile(std::io::Error),

    /// IO error while writing the bundle.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;

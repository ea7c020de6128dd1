//! Eternal history log and remote history relay.
//!
//! The eternal history is the cumulative, cross-host, append-only log of
//! every command executed in any session associated with this environment:
//! one tab-separated record per line, `timestamp\tuser@host\tcwd\tcommand`,
//! owner-only permissions. It has exactly two append points, the local
//! reporter and the relay listener, and is never rewritten except by the
//! explicit offline dedup pass.

pub mod dedup;
pub mod log;
pub mod record;
pub mod relay;
pub mod reporter;
pub mod sync;

pub use dedup::{DedupStats, dedup_history};
pub use log::EternalHistory;
pub use record::HistoryRecord;
pub use relay::RelayListener;
pub use reporter::HistoryReporter;
pub use sync::{SyncStats, sync_local_history};

use thiserror::Error;

/// Errors for history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Locking failed during an offline rewrite.
    #[error(transparent)]
    Lock(#[from] sshb_common::FileLockError),

    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

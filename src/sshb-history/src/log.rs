//! The append-only eternal-history log file.

use super::{HistoryRecord, Result};
use sshb_common::file_permissions::{create_dir_with_mode, open_append_with_mode};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Owner-only permission bits for the log file.
const LOG_MODE: u32 = 0o600;

/// Handle to the eternal-history log.
///
/// Appends open-write-close per record: multiple independent processes
/// append to the same file, and small single-write appends in append mode
/// are treated as sufficiently atomic. No locking on the live log.
#[derive(Debug, Clone)]
pub struct EternalHistory {
    path: PathBuf,
}

impl EternalHistory {
    /// Open (lazily) the log at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the log at its default location.
    pub fn default_location() -> Self {
        Self::new(sshb_common::dirs::default_history_path())
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub fn append(&self, record: &HistoryRecord) -> Result<()> {
        self.append_line(&record.to_line())
    }

    /// Append one raw line verbatim, as received from a relay.
    ///
    /// The line is written with a single trailing newline; no other
    /// transformation is applied.
    pub fn append_line(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_with_mode(parent, 0o700)?;
            }
        }

        let mut file = open_append_with_mode(&self.path, LOG_MODE)?;
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.trim_end_matches('\n').as_bytes());
        buf.push(b'\n');
        file.write_all(&buf)?;
        Ok(())
    }
}

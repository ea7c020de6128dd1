//! Local history reporting.
//!
//! The duplicate-suppression state lives on the reporter instance, not in a
//! global, so independent reporters (one per session, local or relayed)
//! cannot interfere with each other.

use super::HistoryRecord;
use sshb_common::text_sanitize::flatten_command;

/// Produces history records from raw command lines, suppressing noise.
#[derive(Debug, Clone)]
pub struct HistoryReporter {
    user_host: String,
    last_command: Option<String>,
}

impl HistoryReporter {
    /// Create a reporter for a `user@host` identity.
    pub fn new(user_host: impl Into<String>) -> Self {
        Self {
            user_host: user_host.into(),
            last_command: None,
        }
    }

    /// Turn a raw (possibly multi-line) command into a record.
    ///
    /// Returns `None` for commands that are not worth recording: empty
    /// lines, a bare `history` invocation, and consecutive duplicates of
    /// the previously reported command.
    pub fn report(&mut self, cwd: &str, raw_command: &str) -> Option<HistoryRecord> {
        let command = flatten_command(raw_command);

        if command.is_empty() || command == "history" {
            return None;
        }
        if self.last_command.as_deref() == Some(command.as_str()) {
            return None;
        }

        self.last_command = Some(command.clone());
        Some(HistoryRecord::now(self.user_host.clone(), cwd, command))
    }
}

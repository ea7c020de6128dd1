//! History record format.

use chrono::Utc;
use sshb_common::text_sanitize::sanitize_field;

/// Number of tab-separated fields in a history record line.
pub const FIELD_COUNT: usize = 4;

/// One eternal-history record: when, who, where, what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Unix epoch seconds.
    pub timestamp: i64,
    /// `user@host` of the session that ran the command.
    pub user_host: String,
    /// Working directory at the time of the command.
    pub cwd: String,
    /// The command line, already joined to a single line.
    pub command: String,
}

impl HistoryRecord {
    /// Create a record stamped with the current time.
    pub fn now(
        user_host: impl Into<String>,
        cwd: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            user_host: user_host.into(),
            cwd: cwd.into(),
            command: command.into(),
        }
    }

    /// Format as one log line with exactly four tab-separated fields.
    ///
    /// TAB, NUL and newline bytes inside any field are squashed to spaces so
    /// the framing can never be corrupted by command content.
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.timestamp,
            sanitize_field(&self.user_host),
            sanitize_field(&self.cwd),
            sanitize_field(&self.command),
        )
    }

    /// Parse a log line produced by [`HistoryRecord::to_line`] or by the
    /// remote reporting hook. Returns `None` for lines that do not have the
    /// expected shape.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(FIELD_COUNT, '\t');
        let timestamp = parts.next()?.parse().ok()?;
        let user_host = parts.next()?.to_string();
        let cwd = parts.next()?.to_string();
        let command = parts.next()?.to_string();
        Some(Self {
            timestamp,
            user_host,
            cwd,
            command,
        })
    }
}

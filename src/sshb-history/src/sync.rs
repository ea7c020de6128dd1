//! Merge a plain shell history file into the eternal-history log.
//!
//! The local companion of the remote relay: reads a bash `$HISTFILE`
//! (optionally with `#<epoch>` timestamp comment lines), runs each entry
//! through a [`HistoryReporter`] so empty lines, bare `history` and
//! consecutive duplicates are suppressed, and appends the survivors.

use super::{EternalHistory, HistoryReporter, Result};
use std::path::Path;

/// Statistics from a sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    /// History entries scanned.
    pub scanned: usize,
    /// Records appended to the log.
    pub appended: usize,
    /// Entries suppressed by the reporter.
    pub suppressed: usize,
}

/// Append the entries of `histfile` to the log as `user_host` records.
///
/// A missing history file is not an error; it syncs zero entries.
pub fn sync_local_history(
    histfile: &Path,
    log: &EternalHistory,
    user_host: &str,
    cwd: &str,
) -> Result<SyncStats> {
    let mut stats = SyncStats::default();

    let content = match std::fs::read_to_string(histfile) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
        Err(e) => return Err(e.into()),
    };

    let mut reporter = HistoryReporter::new(user_host);
    let mut pending_timestamp: Option<i64> = None;

    for line in content.lines() {
        // Bash HISTTIMEFORMAT writes "#<epoch>" before each entry.
        if let Some(rest) = line.strip_prefix('#') {
            if let Ok(epoch) = rest.trim().parse::<i64>() {
                pending_timestamp = Some(epoch);
                continue;
            }
        }

        stats.scanned += 1;
        match reporter.report(cwd, line) {
            Some(mut record) => {
                if let Some(epoch) = pending_timestamp.take() {
                    record.timestamp = epoch;
                }
                log.append(&record)?;
                stats.appended += 1;
            }
            None => {
                pending_timestamp = None;
                stats.suppressed += 1;
            }
        }
    }

    tracing::debug!(
        scanned = stats.scanned,
        appended = stats.appended,
        suppressed = stats.suppressed,
        "local history synced"
    );

    Ok(stats)
}

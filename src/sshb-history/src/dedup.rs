//! Offline deduplication of a history file.
//!
//! The only operation that ever rewrites a history file. Runs outside any
//! live session, under an exclusive advisory lock, and replaces the file
//! atomically (temp sibling + rename) so concurrent appenders and a second
//! dedup invocation cannot corrupt it.

use super::{HistoryRecord, Result};
use sshb_common::file_locking::{LockConfig, acquire_exclusive_lock};
use std::collections::HashMap;
use std::path::Path;

/// Statistics from a dedup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DedupStats {
    /// Lines scanned.
    pub total: usize,
    /// Lines removed as superseded duplicates.
    pub removed: usize,
}

/// Deduplicate a history file in place, keeping the most recent record for
/// each distinct command string.
///
/// Survivors keep their original relative order. Lines that do not parse as
/// records are preserved and deduplicated by their full text.
pub fn dedup_history(path: &Path, lock_config: &LockConfig) -> Result<DedupStats> {
    let mut guard = acquire_exclusive_lock(path, lock_config)?;
    let content = guard.read_to_string()?;

    let lines: Vec<&str> = content.lines().collect();
    let mut stats = DedupStats {
        total: lines.len(),
        removed: 0,
    };

    // Last index at which each dedup key occurs.
    let mut last_seen: HashMap<String, usize> = HashMap::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        last_seen.insert(dedup_key(line), idx);
    }

    let mut kept = String::with_capacity(content.len());
    for (idx, line) in lines.iter().enumerate() {
        if last_seen.get(&dedup_key(line)) == Some(&idx) {
            kept.push_str(line);
            kept.push('\n');
        } else {
            stats.removed += 1;
        }
    }

    if stats.removed > 0 {
        guard.replace_contents(kept.as_bytes())?;
    }

    tracing::info!(
        total = stats.total,
        removed = stats.removed,
        "history dedup finished"
    );

    Ok(stats)
}

/// Records deduplicate on the command field; anything else on the raw line.
fn dedup_key(line: &str) -> String {
    match HistoryRecord::parse_line(line) {
        Some(record) => record.command,
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_most_recent_occurrence_per_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        std::fs::write(
            &path,
            "1\ta@b\t/\tls\n2\ta@b\t/\tpwd\n3\ta@b\t/home\tls\n",
        )
        .unwrap();

        let stats = dedup_history(&path, &LockConfig::default()).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.removed, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "2\ta@b\t/\tpwd\n3\ta@b\t/home\tls\n");
    }

    #[test]
    fn already_unique_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let original = "1\ta@b\t/\tls\n2\ta@b\t/\tpwd\n";
        std::fs::write(&path, original).unwrap();

        let stats = dedup_history(&path, &LockConfig::default()).unwrap();
        assert_eq!(stats.removed, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn unparseable_lines_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        std::fs::write(&path, "junk\n1\ta@b\t/\tls\njunk\n").unwrap();

        let stats = dedup_history(&path, &LockConfig::default()).unwrap();
        assert_eq!(stats.removed, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1\ta@b\t/\tls\njunk\n");
    }
}

//! sshb home directory and default file locations.

use std::path::PathBuf;

/// Environment variable overriding the sshb home directory.
pub const SSHB_HOME_ENV: &str = "SSHB_HOME";

/// Environment variable overriding the eternal-history log path.
pub const SSHB_HISTORY_ENV: &str = "SSHB_HISTORY_FILE";

/// Resolve the sshb home directory.
///
/// `$SSHB_HOME` wins; otherwise `~/.sshb`. Falls back to the current
/// directory only when no home directory can be determined at all.
pub fn sshb_home() -> PathBuf {
    if let Ok(home) = std::env::var(SSHB_HOME_ENV) {
        if !home.trim().is_empty() {
            return PathBuf::from(home);
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".sshb"))
        .unwrap_or_else(|| PathBuf::from(".sshb"))
}

/// Default path of the eternal-history log.
///
/// `$SSHB_HISTORY_FILE` wins; otherwise `~/.bash_eternal_history`, the
/// location shared with the shell-side local hook.
pub fn default_history_path() -> PathBuf {
    if let Ok(path) = std::env::var(SSHB_HISTORY_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".bash_eternal_history"))
        .unwrap_or_else(|| PathBuf::from(".bash_eternal_history"))
}

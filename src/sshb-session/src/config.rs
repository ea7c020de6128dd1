//! sshb configuration.
//!
//! Loaded from `<sshb home>/config.toml` when present, otherwise defaults.
//! Environment overrides (`SSHB_SSH_PROGRAM`, `SSHB_HISTORY_FILE`) are
//! applied on top of whatever the file provides.

use super::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the ssh client binary.
pub const SSH_PROGRAM_ENV: &str = "SSHB_SSH_PROGRAM";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SshbConfig {
    /// ssh client binary; must support multiplexed control connections.
    pub ssh_program: PathBuf,

    /// Eternal-history log location.
    pub history_file: PathBuf,

    /// Ordered bundle sources. Missing entries are skipped at build time.
    pub bundle_sources: Vec<PathBuf>,

    /// Local shell history file merged by `history sync`.
    pub local_histfile: PathBuf,
}

impl Default for SshbConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            ssh_program: PathBuf::from("ssh"),
            history_file: sshb_common::dirs::default_history_path(),
            bundle_sources: sshb_bundle::builder::DEFAULT_SOURCES
                .iter()
                .map(|name| home.join(name))
                .collect(),
            local_histfile: home.join(".bash_history"),
        }
    }
}

impl SshbConfig {
    /// Load the configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&sshb_common::dirs::sshb_home().join("config.toml"))
    }

    /// Load from an explicit path; a missing file yields the defaults, a
    /// present-but-invalid file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| SessionError::Config {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(SessionError::Config {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                });
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(program) = std::env::var(SSH_PROGRAM_ENV) {
            if !program.trim().is_empty() {
                self.ssh_program = PathBuf::from(program);
            }
        }
        if let Ok(path) = std::env::var(sshb_common::dirs::SSHB_HISTORY_ENV) {
            if !path.trim().is_empty() {
                self.history_file = PathBuf::from(path);
            }
        }
    }
}

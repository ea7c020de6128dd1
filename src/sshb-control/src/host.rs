//! Host specification parsing and canonical resolution.

use super::{ControlError, Result};
use std::path::Path;
use tokio::process::Command;

/// A `[user@]host` target as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    /// The specification exactly as supplied (what ssh receives).
    pub raw: String,
    /// Explicit user part, if any.
    pub user: Option<String>,
    /// Host part.
    pub host: String,
}

impl HostSpec {
    /// Parse a `[user@]host` string.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ControlError::MissingHost);
        }

        let (user, host) = match spec.split_once('@') {
            Some((user, host)) => (Some(user), host),
            None => (None, spec),
        };

        if host.is_empty() || user.map(str::is_empty).unwrap_or(false) {
            return Err(ControlError::InvalidHostSpec(spec.to_string()));
        }

        Ok(Self {
            raw: spec.to_string(),
            user: user.map(str::to_string),
            host: host.to_string(),
        })
    }
}

/// The target after querying the client's effective configuration.
///
/// The canonical hostname is what the explicit disconnect is later issued
/// against; the remote user determines the deterministic remote paths of
/// the installed script and the relay pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    /// Canonical hostname from the client configuration.
    pub canonical_host: String,
    /// Effective remote username.
    pub remote_user: String,
}

impl ResolvedHost {
    /// `user@host` identity string for history records.
    pub fn user_host(&self) -> String {
        format!("{}@{}", self.remote_user, self.canonical_host)
    }
}

/// Resolve a target by querying the client's effective configuration
/// (`ssh -G`). Nothing remote is touched; failure here is fatal for the
/// session but leaves no state behind.
pub async fn resolve(ssh_program: &Path, spec: &HostSpec) -> Result<ResolvedHost> {
    let output = Command::new(ssh_program)
        .arg("-G")
        .arg(&spec.raw)
        .output()
        .await
        .map_err(|e| ControlError::ResolveFailed {
            host: spec.raw.clone(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ControlError::ResolveFailed {
            host: spec.raw.clone(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_config_dump(&stdout, spec)
}

/// Extract `hostname` and `user` from an `ssh -G` configuration dump.
fn parse_config_dump(dump: &str, spec: &HostSpec) -> Result<ResolvedHost> {
    let mut canonical_host = None;
    let mut remote_user = None;

    for line in dump.lines() {
        if let Some(value) = line.strip_prefix("hostname ") {
            canonical_host.get_or_insert_with(|| value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("user ") {
            remote_user.get_or_insert_with(|| value.trim().to_string());
        }
    }

    let canonical_host = canonical_host.ok_or_else(|| ControlError::ResolveFailed {
        host: spec.raw.clone(),
        detail: "no hostname in client configuration dump".to_string(),
    })?;

    // `user` is absent from the dump on very old clients; fall back to the
    // explicit user part or the local username.
    let remote_user = remote_user
        .or_else(|| spec.user.clone())
        .or_else(|| std::env::var("USER").ok())
        .ok_or_else(|| ControlError::ResolveFailed {
            host: spec.raw.clone(),
            detail: "cannot determine remote user".to_string(),
        })?;

    Ok(ResolvedHost {
        canonical_host,
        remote_user,
    })
}

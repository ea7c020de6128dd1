//! Per-invocation session identity.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// One invocation of the orchestrator.
#[derive(Debug)]
pub struct Session {
    /// Unique session id; scopes the listener tag.
    pub id: Uuid,
    /// Target host specification as given (`[user@]host`).
    pub target: String,
    /// Identity files to pass through to the client.
    pub identities: Vec<PathBuf>,
    /// One-shot remote command instead of an interactive shell.
    pub remote_command: Vec<String>,

    cleanup_done: AtomicBool,
}

impl Session {
    /// Create a session for a target.
    pub fn new(target: impl Into<String>, identities: Vec<PathBuf>, remote_command: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            identities,
            remote_command,
            cleanup_done: AtomicBool::new(false),
        }
    }

    /// Tag identifying this session's remote pipe reader, unique per
    /// invocation so teardown can kill it by name without touching a
    /// concurrent session's reader.
    pub fn listener_tag(&self) -> String {
        format!("sshb-relay-{}", self.id.simple())
    }

    /// Claim the one-shot cleanup. Returns `true` for the first caller
    /// only; later callers (a second signal, the normal-exit path after a
    /// signal-triggered cleanup) get `false` and must do nothing.
    pub fn begin_cleanup(&self) -> bool {
        !self.cleanup_done.swap(true, Ordering::SeqCst)
    }
}

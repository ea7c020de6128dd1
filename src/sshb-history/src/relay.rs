//! Relay listener: drains the remote pipe stream into the local log.

use super::EternalHistory;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// Background task reading relayed history lines and appending them
/// verbatim to the eternal-history log.
///
/// Delivery is at-most-once: a line lost when the pipe or connection breaks
/// is not resent, and read or append failures are suppressed. A broken
/// relay degrades history capture, never the session.
#[derive(Debug)]
pub struct RelayListener {
    handle: JoinHandle<()>,
}

impl RelayListener {
    /// Spawn a listener over any line-oriented byte stream (in practice the
    /// stdout of the remote pipe reader running over the control
    /// connection).
    pub fn spawn<R>(reader: R, log: EternalHistory) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.is_empty() {
                            continue;
                        }
                        if let Err(e) = log.append_line(&line) {
                            tracing::debug!("relay append failed: {e}");
                        }
                    }
                    Ok(None) => {
                        tracing::debug!("relay stream closed");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("relay read failed: {e}");
                        break;
                    }
                }
            }
        });

        Self { handle }
    }

    /// Stop the listener without waiting for it. Safe to call after the
    /// task has already finished.
    pub fn shutdown(&self) {
        self.handle.abort();
    }

    /// Wait for the listener to drain its stream (used by tests and by the
    /// normal-exit path, where the stream has already hit EOF).
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

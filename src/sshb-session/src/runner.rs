//! Session runner.
//!
//! Composition order matters: resolve the target (a local configuration
//! query), build the bundle (a bundle failure must abort before any
//! connection is attempted), open the control connection, prime the remote
//! side, start the relay listener, and only then launch the interactive
//! shell - the pipe must exist before the listener starts, and the listener
//! must be running before the remote hook can write.
//!
//! Every awaited step races the cancellation future, so a termination
//! signal during a hung resolve, master start, or prime still tears down
//! whatever exists instead of leaving a detached master behind.

use super::{Result, Session, SshbConfig};
use sshb_bundle::{BundleBuilder, scripts};
use sshb_control::host::{self, HostSpec};
use sshb_control::{ControlConnection, ControlOptions};
use sshb_history::{EternalHistory, RelayListener};
use std::future::Future;
use tokio::process::Child;

/// Exit code reported after a signal-triggered teardown.
const SIGNAL_EXIT_CODE: i32 = 130;

/// Run a session to completion, cleaning up on SIGINT/SIGHUP/SIGTERM as
/// well as on normal return. Returns the remote shell's exit code.
pub async fn run_session(config: &SshbConfig, session: &Session) -> Result<i32> {
    // Spawning installs the signal streams before any setup step can
    // block; an async fn passed directly would only arm them at its
    // first poll.
    let signals = tokio::spawn(wait_for_termination_signal());
    let abort = signals.abort_handle();
    let result = run_session_with_cancel(config, session, async move {
        let _ = signals.await;
    })
    .await;
    abort.abort();
    result
}

/// Run a session with an explicit cancellation future standing in for
/// process termination signals.
pub async fn run_session_with_cancel(
    config: &SshbConfig,
    session: &Session,
    cancel: impl Future<Output = ()>,
) -> Result<i32> {
    tokio::pin!(cancel);

    let spec = HostSpec::parse(&session.target)?;

    let resolved = tokio::select! {
        resolved = host::resolve(&config.ssh_program, &spec) => resolved?,
        _ = &mut cancel => return Ok(SIGNAL_EXIT_CODE),
    };
    tracing::info!(
        session = %session.id,
        remote = %resolved.user_host(),
        "starting remote session"
    );

    let options = ControlOptions {
        ssh_program: config.ssh_program.clone(),
        target: session.target.clone(),
        identities: session.identities.clone(),
    };

    // One-shot remote command: no bundle, no priming, no relay. The
    // command runs in the remote default environment and leaves nothing
    // behind on the remote side.
    if !session.remote_command.is_empty() {
        let mut connection = tokio::select! {
            opened = ControlConnection::open_with_resolved(options, resolved) => opened?,
            _ = &mut cancel => return Ok(SIGNAL_EXIT_CODE),
        };
        let outcome = tokio::select! {
            status = connection.run_command(&session.remote_command) => Some(status),
            _ = &mut cancel => None,
        };
        cleanup(session, &mut connection, None, None).await;
        return match outcome {
            Some(Ok(status)) => Ok(status.code().unwrap_or(1)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(SIGNAL_EXIT_CODE),
        };
    }

    // Bundle before connection: a temp-file failure aborts here, with
    // nothing to tear down.
    let preamble = scripts::preamble(&resolved.remote_user, &resolved.canonical_host);
    let builder = BundleBuilder::new(preamble, config.bundle_sources.clone());
    let (bundle, stats) = tokio::select! {
        built = builder.build() => built?,
        _ = &mut cancel => return Ok(SIGNAL_EXIT_CODE),
    };
    tracing::debug!(
        included = stats.included,
        skipped = stats.skipped,
        "bundle ready"
    );

    let script_path = scripts::remote_script_path(&resolved.remote_user);
    let pipe_path = scripts::remote_pipe_path(&resolved.remote_user);

    // A cancel here drops the half-open connection; its Drop issues the
    // best-effort disconnect.
    let mut connection = tokio::select! {
        opened = ControlConnection::open_with_resolved(options, resolved) => opened?,
        _ = &mut cancel => return Ok(SIGNAL_EXIT_CODE),
    };

    let primed = tokio::select! {
        primed = connection.prime(bundle.path(), &script_path, &pipe_path) => Some(primed),
        _ = &mut cancel => None,
    };
    match primed {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            cleanup(session, &mut connection, None, None).await;
            return Err(e.into());
        }
        None => {
            cleanup(session, &mut connection, None, None).await;
            return Ok(SIGNAL_EXIT_CODE);
        }
    }

    // The bundle is deleted immediately after successful transmission.
    if let Err(e) = bundle.remove() {
        tracing::warn!("bundle removal failed: {e}");
    }

    // Relay listener before the interactive shell.
    let tag = session.listener_tag();
    let mut reader = match connection.spawn_pipe_reader(&tag, &pipe_path) {
        Ok(child) => child,
        Err(e) => {
            cleanup(session, &mut connection, None, None).await;
            return Err(e.into());
        }
    };
    let reader_stdout = match reader.stdout.take() {
        Some(stdout) => stdout,
        None => {
            cleanup(session, &mut connection, None, Some(&mut reader)).await;
            return Err(super::SessionError::Internal(
                "pipe reader has no stdout".into(),
            ));
        }
    };
    let listener = RelayListener::spawn(
        reader_stdout,
        EternalHistory::new(config.history_file.clone()),
    );

    let outcome = tokio::select! {
        status = connection.launch_interactive(&script_path) => Some(status),
        _ = &mut cancel => None,
    };

    match outcome {
        Some(Ok(status)) => {
            cleanup(session, &mut connection, Some(&listener), Some(&mut reader)).await;
            Ok(status.code().unwrap_or(1))
        }
        Some(Err(e)) => {
            cleanup(session, &mut connection, Some(&listener), Some(&mut reader)).await;
            Err(e.into())
        }
        None => {
            tracing::info!("termination signal received, tearing down");
            cleanup(session, &mut connection, Some(&listener), Some(&mut reader)).await;
            Ok(SIGNAL_EXIT_CODE)
        }
    }
}

/// Tear down the session's resources. One-shot per session: the first call
/// does the work, later calls are no-ops, so a signal-triggered cleanup
/// followed by the normal-exit path cannot double-fire.
async fn cleanup(
    session: &Session,
    connection: &mut ControlConnection,
    listener: Option<&RelayListener>,
    reader: Option<&mut Child>,
) {
    if !session.begin_cleanup() {
        tracing::debug!("cleanup already performed");
        return;
    }
    tracing::debug!(session = %session.id, "session cleanup");

    if let Some(listener) = listener {
        listener.shutdown();
    }
    if let Some(child) = reader {
        // Best-effort, non-blocking: do not wait for the reader to die.
        let _ = child.start_kill();
    }
    connection.shutdown().await;
}

/// Resolve when the process receives INT, HUP, or TERM.
async fn wait_for_termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut interrupt = match signal(SignalKind::interrupt()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("cannot install INT handler: {e}");
                return std::future::pending().await;
            }
        };
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("cannot install HUP handler: {e}");
                return std::future::pending().await;
            }
        };
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("cannot install TERM handler: {e}");
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = interrupt.recv() => tracing::debug!("SIGINT"),
            _ = hangup.recv() => tracing::debug!("SIGHUP"),
            _ = terminate.recv() => tracing::debug!("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

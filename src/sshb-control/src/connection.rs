//! The multiplexed control connection.

use super::host::{self, HostSpec, ResolvedHost};
use super::{ControlError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

/// Lifecycle of a control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing resolved, nothing connected.
    Uninitialized,
    /// Querying the client configuration for the canonical hostname.
    ResolvingHost,
    /// Background master established.
    Connected,
    /// Remote script installed and relay pipe present.
    Primed,
    /// Remote shell or one-shot command running (or finished, awaiting
    /// teardown).
    Interactive,
    /// Teardown in progress.
    Closing,
    /// Teardown finished; the connection is inert.
    Closed,
}

/// Options for opening a control connection.
#[derive(Debug, Clone)]
pub struct ControlOptions {
    /// Path or name of the ssh client binary.
    pub ssh_program: PathBuf,
    /// Target as given on the command line (`[user@]host`).
    pub target: String,
    /// Identity files passed through as `-i` options.
    pub identities: Vec<PathBuf>,
}

impl ControlOptions {
    /// Options for a target with the default client binary.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            ssh_program: PathBuf::from("ssh"),
            target: target.into(),
            identities: Vec::new(),
        }
    }

    /// Override the ssh client binary.
    pub fn ssh_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.ssh_program = program.into();
        self
    }

    /// Add an identity file.
    pub fn identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identities.push(path.into());
        self
    }
}

/// One multiplexed remote connection and every auxiliary command issued
/// through it.
///
/// Teardown is idempotent: the first [`ControlConnection::shutdown`] call
/// does the work, later calls (including the one from `Drop`) are no-ops.
#[derive(Debug)]
pub struct ControlConnection {
    ssh_program: PathBuf,
    target: String,
    identities: Vec<PathBuf>,
    resolved: ResolvedHost,
    control_dir: Option<TempDir>,
    socket_path: PathBuf,
    listener_tag: Option<String>,
    state: ConnectionState,
}

impl ControlConnection {
    /// Resolve the target and establish the background master.
    ///
    /// Failure at any point here is fatal for the session; host resolution
    /// happens before anything remote is touched, and a master that fails
    /// to start leaves only the local control directory, which is removed
    /// on drop.
    pub async fn open(options: ControlOptions) -> Result<Self> {
        let spec = HostSpec::parse(&options.target)?;

        tracing::debug!(host = %spec.raw, "resolving host");
        let resolved = host::resolve(&options.ssh_program, &spec).await?;
        tracing::debug!(
            canonical = %resolved.canonical_host,
            user = %resolved.remote_user,
            "host resolved"
        );

        Self::open_with_resolved(options, resolved).await
    }

    /// Establish the master for a target whose canonical identity was
    /// already resolved (the orchestrator resolves before building the
    /// bundle, so a bundle failure aborts with no connection attempted).
    pub async fn open_with_resolved(
        options: ControlOptions,
        resolved: ResolvedHost,
    ) -> Result<Self> {
        let control_dir = tempfile::Builder::new()
            .prefix("sshb-control.")
            .tempdir()?;
        let socket_path = control_dir.path().join("control.sock");

        let mut connection = Self {
            ssh_program: options.ssh_program,
            target: options.target,
            identities: options.identities,
            resolved,
            control_dir: Some(control_dir),
            socket_path,
            listener_tag: None,
            state: ConnectionState::ResolvingHost,
        };

        connection.start_master().await?;
        connection.state = ConnectionState::Connected;
        Ok(connection)
    }

    /// Start the background multiplexed master (`-M -N -f`).
    async fn start_master(&mut self) -> Result<()> {
        let mut cmd = Command::new(&self.ssh_program);
        for identity in &self.identities {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg("-M")
            .arg("-N")
            .arg("-f")
            .arg("-S")
            .arg(&self.socket_path)
            .arg(&self.target)
            .stdin(Stdio::null());

        let output = cmd
            .output()
            .await
            .map_err(|e| ControlError::MasterFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(ControlError::MasterFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        tracing::debug!(socket = %self.socket_path.display(), "control master up");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The resolved target identity.
    pub fn resolved(&self) -> &ResolvedHost {
        &self.resolved
    }

    /// Path of the control socket.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// A command pre-wired to run over the existing master.
    fn multiplexed_command(&self) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.arg("-S").arg(&self.socket_path);
        cmd
    }

    /// Run an auxiliary command on the remote host over the control
    /// connection, capturing its output.
    pub async fn run_remote(&self, remote_command: &str) -> Result<std::process::Output> {
        if self.state == ConnectionState::Closed {
            return Err(ControlError::InvalidState {
                expected: ConnectionState::Connected,
                actual: self.state,
            });
        }

        let mut cmd = self.multiplexed_command();
        cmd.arg(&self.target)
            .arg(remote_command)
            .stdin(Stdio::null());
        Ok(cmd.output().await?)
    }

    /// Transmit the bundle and prepare the remote side in one invocation:
    /// install the script at `script_path`, make it executable, and create
    /// the relay pipe at `pipe_path` (mode 0600) if it is not already
    /// there. Doing both in a single remote command keeps "script present
    /// and pipe present" atomic with respect to this session.
    pub async fn prime(&mut self, bundle_path: &Path, script_path: &str, pipe_path: &str) -> Result<()> {
        self.require_state(ConnectionState::Connected)?;

        let content = tokio::fs::read(bundle_path).await?;
        let script = quote(script_path)?;
        let pipe = quote(pipe_path)?;
        let remote = format!(
            "cat > {script} && chmod 700 {script} && ([ -p {pipe} ] || mkfifo -m 600 {pipe})"
        );

        let mut cmd = self.multiplexed_command();
        cmd.arg(&self.target)
            .arg(&remote)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&content).await?;
            stdin.shutdown().await?;
        }
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(ControlError::RemoteCommand(format!(
                "priming failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::debug!(script = script_path, pipe = pipe_path, "remote primed");
        self.state = ConnectionState::Primed;
        Ok(())
    }

    /// Start the tagged remote pipe reader over a secondary channel of the
    /// same master, its stdout piped back locally.
    ///
    /// The reader loops `cat` on the pipe so writer EOFs do not end the
    /// relay; the tag embedded in its command line is what the teardown
    /// `pkill -f` matches.
    pub fn spawn_pipe_reader(&mut self, tag: &str, pipe_path: &str) -> Result<Child> {
        self.require_state(ConnectionState::Primed)?;

        let pipe = quote(pipe_path)?;
        let remote = format!(": {tag}; while :; do cat {pipe}; done");

        let mut cmd = self.multiplexed_command();
        cmd.arg(&self.target)
            .arg(&remote)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = cmd.spawn()?;
        self.listener_tag = Some(tag.to_string());
        tracing::debug!(tag, "relay reader spawned");
        Ok(child)
    }

    /// Launch the interactive remote shell, forcing the installed script as
    /// its rc-file, and block until the user's remote session ends.
    ///
    /// Requires the pipe reader to be running: the relay must have a reader
    /// before the remote hook can start writing.
    pub async fn launch_interactive(&mut self, script_path: &str) -> Result<std::process::ExitStatus> {
        self.require_state(ConnectionState::Primed)?;
        if self.listener_tag.is_none() {
            return Err(ControlError::RemoteCommand(
                "interactive launch before relay reader".to_string(),
            ));
        }

        let script = quote(script_path)?;
        let remote = format!("exec bash --rcfile {script} -i");

        self.state = ConnectionState::Interactive;
        let mut cmd = self.multiplexed_command();
        cmd.arg("-t").arg(&self.target).arg(&remote);

        let mut child = cmd.spawn()?;
        Ok(child.wait().await?)
    }

    /// Run a one-shot remote command instead of an interactive shell,
    /// inheriting the local stdio.
    ///
    /// One-shot sessions skip priming entirely (no script, no pipe), so
    /// this runs directly from `Connected` and installs nothing remotely.
    pub async fn run_command(&mut self, command: &[String]) -> Result<std::process::ExitStatus> {
        self.require_state(ConnectionState::Connected)?;

        let remote = shlex::try_join(command.iter().map(String::as_str))
            .map_err(|_| ControlError::Quoting(command.join(" ")))?;

        self.state = ConnectionState::Interactive;
        let mut cmd = self.multiplexed_command();
        cmd.arg(&self.target).arg(&remote);

        let mut child = cmd.spawn()?;
        Ok(child.wait().await?)
    }

    /// Tear down the connection. Idempotent; every step is best-effort and
    /// failures are tolerated (logged, never propagated).
    ///
    /// Order: kill the remote reader by tag, explicit multiplexer
    /// disconnect (`-O exit`, a real disconnect request rather than a local
    /// socket close), then remove the control directory.
    pub async fn shutdown(&mut self) {
        if matches!(self.state, ConnectionState::Closing | ConnectionState::Closed) {
            return;
        }
        self.state = ConnectionState::Closing;

        if let Some(tag) = self.listener_tag.take() {
            let kill = format!("pkill -f {tag} 2>/dev/null || true");
            match self.run_remote(&kill).await {
                Ok(_) => tracing::debug!(tag, "remote reader kill issued"),
                Err(e) => tracing::warn!("remote reader kill failed: {e}"),
            }
        }

        let mut cmd = self.multiplexed_command();
        cmd.arg("-O")
            .arg("exit")
            .arg(&self.target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        match cmd.status().await {
            Ok(status) if status.success() => tracing::debug!("control master disconnected"),
            Ok(status) => tracing::warn!("control master exit returned {status}"),
            Err(e) => tracing::warn!("control master exit failed: {e}"),
        }

        if let Some(dir) = self.control_dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!("control directory removal failed: {e}");
            }
        }

        self.state = ConnectionState::Closed;
    }

    fn require_state(&self, expected: ConnectionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ControlError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }
}

impl Drop for ControlConnection {
    fn drop(&mut self) {
        // Last-resort teardown for paths that never reached shutdown().
        // Blocking and best-effort; the TempDir field removes the control
        // directory itself.
        if !matches!(self.state, ConnectionState::Closed) && self.socket_path.exists() {
            let _ = std::process::Command::new(&self.ssh_program)
                .arg("-S")
                .arg(&self.socket_path)
                .arg("-O")
                .arg("exit")
                .arg(&self.target)
                .stdin(std::process::Stdio::null())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status();
        }
    }
}

/// Quote a string for the remote POSIX shell.
fn quote(text: &str) -> Result<String> {
    shlex::try_quote(text)
        .map(|quoted| quoted.into_owned())
        .map_err(|_| ControlError::Quoting(text.to_string()))
}

//! Full control-connection lifecycle against a stub ssh client.
//!
//! The stub records every invocation to a log file and answers `-G` with a
//! fixed configuration dump, which is enough to drive the whole state
//! machine without a network.

use std::path::{Path, PathBuf};

use sshb_control::{ConnectionState, ControlConnection, ControlOptions};

struct StubSsh {
    _dir: tempfile::TempDir,
    program: PathBuf,
    log: PathBuf,
    bundle_capture: PathBuf,
}

impl StubSsh {
    fn install() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("ssh");
        let log = dir.path().join("invocations.log");
        let bundle_capture = dir.path().join("bundle.capture");

        let script = format!(
            r#"#!/usr/bin/env bash
printf '%s\n' "$*" >> {log}
case " $* " in
  *" -G "*)
    printf 'hostname canonical.test\nuser alice\n'
    exit 0
    ;;
  *"cat > "*)
    cat > {capture}
    exit 0
    ;;
esac
exit 0
"#,
            log = shlex::try_quote(log.to_str().unwrap()).unwrap(),
            capture = shlex::try_quote(bundle_capture.to_str().unwrap()).unwrap(),
        );
        std::fs::write(&program, script).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        Self {
            _dir: dir,
            program,
            log,
            bundle_capture,
        }
    }

    fn invocations(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn count_containing(&self, needle: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    fn index_of(&self, needle: &str) -> Option<usize> {
        self.invocations()
            .iter()
            .position(|line| line.contains(needle))
    }
}

fn write_bundle(dir: &Path) -> PathBuf {
    let path = dir.join("bundle.sh");
    std::fs::write(&path, "#!/bin/bash\nexport SSHB_REMOTE_SESSION=1\n").unwrap();
    path
}

#[tokio::test]
async fn full_session_lifecycle() {
    let stub = StubSsh::install();
    let workdir = tempfile::tempdir().unwrap();
    let bundle = write_bundle(workdir.path());

    let mut connection = ControlConnection::open(
        ControlOptions::new("alice@devbox").ssh_program(&stub.program),
    )
    .await
    .unwrap();

    assert_eq!(connection.state(), ConnectionState::Connected);
    assert_eq!(connection.resolved().canonical_host, "canonical.test");
    assert_eq!(connection.resolved().remote_user, "alice");

    connection
        .prime(&bundle, "/tmp/bashrc_alice", "/tmp/sshb_hist_alice.pipe")
        .await
        .unwrap();
    assert_eq!(connection.state(), ConnectionState::Primed);

    // The bundle arrived byte-for-byte through the prime invocation.
    let transmitted = std::fs::read_to_string(&stub.bundle_capture).unwrap();
    assert_eq!(transmitted, "#!/bin/bash\nexport SSHB_REMOTE_SESSION=1\n");

    // Pipe creation is part of the same remote invocation as the install.
    assert_eq!(stub.count_containing("mkfifo -m 600"), 1);
    let prime_line = stub
        .invocations()
        .into_iter()
        .find(|line| line.contains("mkfifo"))
        .unwrap();
    assert!(prime_line.contains("cat > /tmp/bashrc_alice"));
    assert!(prime_line.contains("chmod 700 /tmp/bashrc_alice"));

    let _reader = connection
        .spawn_pipe_reader("sshb-relay-test", "/tmp/sshb_hist_alice.pipe")
        .unwrap();

    let status = connection
        .launch_interactive("/tmp/bashrc_alice")
        .await
        .unwrap();
    assert!(status.success());
    assert_eq!(connection.state(), ConnectionState::Interactive);

    // The interactive launch references the rc-file exactly once.
    assert_eq!(stub.count_containing("--rcfile /tmp/bashrc_alice"), 1);

    let socket_dir = connection.socket_path().parent().unwrap().to_path_buf();
    assert!(socket_dir.exists());

    connection.shutdown().await;
    assert_eq!(connection.state(), ConnectionState::Closed);
    assert!(!socket_dir.exists());

    // Teardown again: no further remote traffic, no crash.
    let invocations_after_first = stub.invocations().len();
    connection.shutdown().await;
    assert_eq!(stub.invocations().len(), invocations_after_first);

    // Exactly one explicit disconnect, one tagged kill.
    assert_eq!(stub.count_containing("-O exit"), 1);
    assert_eq!(stub.count_containing("pkill -f sshb-relay-test"), 1);

    // Ordering: resolve, master, prime, reader, interactive, kill, exit.
    let master = stub.index_of("-M -N -f").unwrap();
    let prime = stub.index_of("mkfifo").unwrap();
    let reader = stub.index_of("while :; do cat").unwrap();
    let interactive = stub.index_of("--rcfile").unwrap();
    let kill = stub.index_of("pkill").unwrap();
    let exit = stub.index_of("-O exit").unwrap();
    assert!(stub.index_of("-G").unwrap() < master);
    assert!(master < prime);
    assert!(prime < reader);
    assert!(reader < interactive);
    assert!(interactive < kill);
    assert!(kill < exit);
}

#[tokio::test]
async fn prime_requires_connected_state() {
    let stub = StubSsh::install();
    let workdir = tempfile::tempdir().unwrap();
    let bundle = write_bundle(workdir.path());

    let mut connection = ControlConnection::open(
        ControlOptions::new("alice@devbox").ssh_program(&stub.program),
    )
    .await
    .unwrap();

    connection.shutdown().await;
    let err = connection
        .prime(&bundle, "/tmp/bashrc_alice", "/tmp/p.pipe")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expected"));
}

#[tokio::test]
async fn interactive_launch_requires_running_reader() {
    let stub = StubSsh::install();
    let workdir = tempfile::tempdir().unwrap();
    let bundle = write_bundle(workdir.path());

    let mut connection = ControlConnection::open(
        ControlOptions::new("alice@devbox").ssh_program(&stub.program),
    )
    .await
    .unwrap();
    connection
        .prime(&bundle, "/tmp/bashrc_alice", "/tmp/p.pipe")
        .await
        .unwrap();

    let err = connection
        .launch_interactive("/tmp/bashrc_alice")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("relay reader"));

    connection.shutdown().await;
}

#[tokio::test]
async fn one_shot_command_runs_without_priming() {
    let stub = StubSsh::install();

    let mut connection = ControlConnection::open(
        ControlOptions::new("alice@devbox").ssh_program(&stub.program),
    )
    .await
    .unwrap();

    let status = connection
        .run_command(&["uname".to_string(), "-a".to_string()])
        .await
        .unwrap();
    assert!(status.success());
    assert_eq!(connection.state(), ConnectionState::Interactive);

    connection.shutdown().await;

    // The command went straight over the connection; no script was
    // installed and no pipe created.
    assert_eq!(stub.count_containing("uname -a"), 1);
    assert_eq!(stub.count_containing("cat > "), 0);
    assert_eq!(stub.count_containing("mkfifo"), 0);
    assert_eq!(stub.count_containing("-O exit"), 1);
}

#[tokio::test]
async fn identity_options_reach_the_master() {
    let stub = StubSsh::install();

    let mut connection = ControlConnection::open(
        ControlOptions::new("alice@devbox")
            .ssh_program(&stub.program)
            .identity("/home/alice/.ssh/id_ed25519"),
    )
    .await
    .unwrap();

    let master_line = stub
        .invocations()
        .into_iter()
        .find(|line| line.contains("-M -N -f"))
        .unwrap();
    assert!(master_line.contains("-i /home/alice/.ssh/id_ed25519"));

    connection.shutdown().await;
}

#[tokio::test]
async fn resolve_failure_touches_nothing_remote() {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("ssh");
    std::fs::write(&program, "#!/usr/bin/env bash\nexit 255\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let err = ControlConnection::open(
        ControlOptions::new("alice@unreachable").ssh_program(&program),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("failed to resolve host"));
}

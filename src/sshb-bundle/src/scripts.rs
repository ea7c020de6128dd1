//! Shell text shipped to the remote host.
//!
//! The preamble is the synthetic head of every bundle: interpreter marker,
//! remote-session marker variable, the deterministic per-user paths of the
//! installed script and the relay pipe, the history-reporting hook, and the
//! exit trap that removes both remote artifacts when the remote shell ends.

/// Interpreter marker placed on the first line of every bundle.
pub const INTERPRETER_LINE: &str = "#!/bin/bash";

/// Environment variable marking a shell as an sshb remote-relay session.
///
/// Read by rc logic to distinguish relayed sessions from plain local ones.
pub const REMOTE_SESSION_VAR: &str = "SSHB_REMOTE_SESSION";

/// Deterministic remote path of the installed rc script for a remote user.
pub fn remote_script_path(remote_user: &str) -> String {
    format!("/tmp/bashrc_{remote_user}")
}

/// Deterministic remote path of the relay pipe for a remote user.
pub fn remote_pipe_path(remote_user: &str) -> String {
    format!("/tmp/sshb_hist_{remote_user}.pipe")
}

/// History-reporting hook installed on the remote side.
///
/// After each command the hook reconstructs the latest history entry,
/// joins continuation lines, and writes one tab-separated record
/// (epoch seconds, user@host, cwd, command) to the relay pipe. Empty
/// commands, bare `history`, and consecutive duplicates are skipped, and
/// TAB/NUL bytes in cwd or command are squashed to spaces. Pipe-write
/// failures are suppressed: a dead listener degrades the relay, never the
/// session.
pub const HISTORY_HOOK_SCRIPT: &str = r##"
__sshb_last_reported=""
__sshb_report_history() {
    local entry cmd
    entry=$(HISTTIMEFORMAT= builtin history 1 2>/dev/null) || return 0
    cmd=$(printf '%s' "$entry" | sed -e '1s/^ *[0-9][0-9]* *//' | tr '\n' ' ')
    cmd="${cmd#"${cmd%%[![:space:]]*}"}"
    cmd="${cmd%"${cmd##*[![:space:]]}"}"
    [ -n "$cmd" ] || return 0
    [ "$cmd" = history ] && return 0
    [ "$cmd" = "$__sshb_last_reported" ] && return 0
    __sshb_last_reported=$cmd
    printf '%s\t%s\t%s\t%s\n' \
        "$(date +%s)" \
        "${USER}@${SSHB_REMOTE_HOST}" \
        "$(pwd -P | tr '\t\0' '  ')" \
        "$(printf '%s' "$cmd" | tr '\t\0' '  ')" \
        > "$SSHB_HISTORY_PIPE" 2>/dev/null || true
}
"##;

/// Build the full bundle preamble for a remote user/host pair.
pub fn preamble(remote_user: &str, remote_host: &str) -> String {
    let script_path = remote_script_path(remote_user);
    let pipe_path = remote_pipe_path(remote_user);

    format!(
        r##"{INTERPRETER_LINE}
# sshb remote session bundle
export {REMOTE_SESSION_VAR}=1
export SSHB_REMOTE_HOST={remote_host}
SSHB_REMOTE_RC={script_path}
SSHB_HISTORY_PIPE={pipe_path}
{HISTORY_HOOK_SCRIPT}
PROMPT_COMMAND=__sshb_report_history
trap 'rm -f "$SSHB_REMOTE_RC" "$SSHB_HISTORY_PIPE"' EXIT

"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_per_user() {
        assert_eq!(remote_script_path("alice"), "/tmp/bashrc_alice");
        assert_eq!(remote_pipe_path("alice"), "/tmp/sshb_hist_alice.pipe");
    }

    #[test]
    fn preamble_starts_with_interpreter_marker() {
        let text = preamble("alice", "devbox");
        assert!(text.starts_with(INTERPRETER_LINE));
    }

    #[test]
    fn preamble_marks_remote_session_and_wires_hook() {
        let text = preamble("alice", "devbox");
        assert!(text.contains("export SSHB_REMOTE_SESSION=1"));
        assert!(text.contains("__sshb_report_history"));
        assert!(text.contains("PROMPT_COMMAND=__sshb_report_history"));
        assert!(text.contains("/tmp/bashrc_alice"));
        assert!(text.contains("/tmp/sshb_hist_alice.pipe"));
    }

    #[test]
    fn preamble_installs_exit_trap_for_both_artifacts() {
        let text = preamble("alice", "devbox");
        assert!(text.contains(r#"trap 'rm -f "$SSHB_REMOTE_RC" "$SSHB_HISTORY_PIPE"' EXIT"#));
    }

    #[test]
    fn hook_suppresses_pipe_write_failures() {
        assert!(HISTORY_HOOK_SCRIPT.contains("2>/dev/null || true"));
    }
}

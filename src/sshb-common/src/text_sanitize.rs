//! Text sanitization for history record fields.
//!
//! History records are tab-separated, one per line. A raw TAB or NUL inside
//! the working-directory or command field would corrupt the record framing,
//! and an embedded newline would split one record across two lines.

use std::borrow::Cow;

/// Replace characters that would break record framing (TAB, NUL, newlines)
/// with a single space.
///
/// Returns `Cow::Borrowed` when the input is already clean, `Cow::Owned`
/// otherwise.
///
/// # Examples
/// ```
/// use sshb_common::text_sanitize::sanitize_field;
///
/// assert_eq!(sanitize_field("ls\t-la"), "ls -la");
/// assert_eq!(sanitize_field("plain"), "plain");
/// ```
pub fn sanitize_field(text: &str) -> Cow<'_, str> {
    let needs_sanitization = text
        .chars()
        .any(|c| matches!(c, '\t' | '\0' | '\n' | '\r'));

    if !needs_sanitization {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' | '\0' | '\n' | '\r' => result.push(' '),
            _ => result.push(c),
        }
    }

    Cow::Owned(result)
}

/// Join a possibly multi-line command into one line.
///
/// Continuation lines from the shell history ("here-docs", backslash
/// continuations) arrive as embedded newlines; each run of newline plus
/// leading whitespace collapses to a single space. Trailing and leading
/// whitespace is trimmed.
pub fn flatten_command(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    for (i, line) in command.lines().enumerate() {
        let piece = if i == 0 { line.trim_end() } else { line.trim() };
        if piece.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out.trim().to_string()
}

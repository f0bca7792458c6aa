//! Splits a command string into an argument vector.
//!
//! Quoting follows POSIX word-splitting: quotes group words and are removed,
//! backslashes escape. Nothing is expanded or interpreted. `$HOME`, `*.txt`,
//! `|`, `>` and `;` stay literal argument text, and the result is always a
//! single program invocation. `#` is literal too; there are no comments.

use shared::PipelineError;
use std::borrow::Cow;

pub fn tokenize(raw: &str) -> Result<Vec<String>, PipelineError> {
    let argv = shell_words::split(&escape_comment_markers(raw))
        .map_err(|e| PipelineError::parse(e.to_string()))?;
    if argv.is_empty() {
        return Err(PipelineError::parse("empty command"));
    }
    Ok(argv)
}

/// Backslash-escape every unquoted `#` so the splitter keeps it as text
/// instead of dropping the rest of the line as a comment.
fn escape_comment_markers(raw: &str) -> Cow<'_, str> {
    if !raw.contains('#') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len() + 4);
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_single => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(c);
            }
            '#' if !in_single && !in_double => out.push_str("\\#"),
            _ => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// Whether the first token is the elevation keyword (e.g. `sudo`).
pub fn starts_with_elevation(argv: &[String], keyword: &str) -> bool {
    argv.first()
        .is_some_and(|first| first.eq_ignore_ascii_case(keyword))
}

/// Drop every leading elevation keyword so a re-run is never double-elevated.
pub fn strip_elevation(argv: &[String], keyword: &str) -> Vec<String> {
    argv.iter()
        .skip_while(|token| token.eq_ignore_ascii_case(keyword))
        .cloned()
        .collect()
}

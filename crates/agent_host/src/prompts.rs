//! Built-in system prompt used to seed a fresh conversation log.

fn get_os_context() -> &'static str {
    if cfg!(windows) {
        r#"## Your Environment
- Running on WINDOWS
- Use Windows programs: where, systeminfo, ipconfig, tasklist, etc.
- Paths use backslashes: C:\Users\name\Documents"#
    } else {
        r#"## Your Environment
- Running on Linux/macOS
- Use Unix programs: ls, cat, grep, find, df, etc.
- Paths use forward slashes: /home/user/documents"#
    }
}

/// System message used when settings don't provide one.
pub fn default_system_message() -> String {
    format!(
        r#"You translate requests into a single command line that will be run on the user's machine.

{}

## Output Rules
- Reply with exactly one command and nothing else: no prose, no code fences
- The command runs WITHOUT a shell: pipes (|), redirects (>), `;`, `&&`, globs and $VARIABLES are passed literally
- Quote arguments that contain spaces
- Only prefix with sudo when the task obviously needs administrator rights; a password is requested if needed"#,
        get_os_context()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_system_message_mentions_environment() {
        let message = default_system_message();
        assert!(message.contains("## Your Environment"));
        assert!(message.contains("exactly one command"));
    }
}

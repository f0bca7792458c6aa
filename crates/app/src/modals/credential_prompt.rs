//! Masked password entry for elevated commands.
//!
//! - Every typed character echoes as `*`
//! - Backspace edits, Enter submits, Esc or Ctrl-C cancels
//! - The buffer is zeroed on drop
//! - Raw mode is switched off again on every exit path

use super::ModalResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, IsTerminal, Write};
use zeroize::Zeroizing;

// Reserved up front so typing a normal-length password never reallocates
const INITIAL_CAPACITY: usize = 128;

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Password prompt for sudo/admin commands.
pub struct CredentialPrompt {
    /// The password being entered (securely zeroed on drop)
    password: Zeroizing<String>,
    /// Shown before the input
    message: String,
}

impl CredentialPrompt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(String::with_capacity(INITIAL_CAPACITY)),
            message: message.into(),
        }
    }

    /// Ask for the credential on the controlling terminal.
    ///
    /// When stdin is not a terminal one line is read instead, without echo
    /// handling.
    pub fn run(mut self) -> io::Result<ModalResult<Zeroizing<String>>> {
        let mut out = io::stdout();
        write!(out, "{}", self.message)?;
        out.flush()?;

        if !io::stdin().is_terminal() {
            return self.read_line(io::stdin().lock());
        }

        let result = {
            let _raw = RawModeGuard::enable()?;
            loop {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                // Windows also reports releases
                if key.kind == KeyEventKind::Release {
                    continue;
                }

                let before = self.password.len();
                let result = self.apply_key(key);
                let after = self.password.len();
                if after > before {
                    write!(out, "*")?;
                } else if after < before {
                    write!(out, "\x08 \x08")?;
                }
                out.flush()?;

                if !result.is_pending() {
                    break result;
                }
            }
        };

        writeln!(out)?;
        Ok(result)
    }

    fn read_line(&mut self, mut input: impl BufRead) -> io::Result<ModalResult<Zeroizing<String>>> {
        let mut line = Zeroizing::new(String::with_capacity(INITIAL_CAPACITY));
        input.read_line(&mut line)?;
        println!();

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Ok(ModalResult::Cancelled);
        }
        self.password.push_str(trimmed);
        Ok(self.take())
    }

    /// Feed one key press.
    fn apply_key(&mut self, key: KeyEvent) -> ModalResult<Zeroizing<String>> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.cancel(),
            KeyCode::Esc => self.cancel(),
            KeyCode::Enter if self.password.is_empty() => ModalResult::Pending,
            KeyCode::Enter => self.take(),
            KeyCode::Backspace => {
                self.password.pop();
                ModalResult::Pending
            }
            KeyCode::Char(c) => {
                self.password.push(c);
                ModalResult::Pending
            }
            _ => ModalResult::Pending,
        }
    }

    fn take(&mut self) -> ModalResult<Zeroizing<String>> {
        let password = std::mem::replace(&mut self.password, Zeroizing::new(String::new()));
        ModalResult::Confirmed(password)
    }

    fn cancel(&mut self) -> ModalResult<Zeroizing<String>> {
        self.password = Zeroizing::new(String::new());
        ModalResult::Cancelled
    }
}

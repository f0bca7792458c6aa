//! Escalation controller
//!
//! Drives one command through at most two runs:
//!
//! ```text
//! UNPRIVILEGED_ATTEMPT -> SUCCESS | FAILED | NEEDS_ESCALATION
//! NEEDS_ESCALATION -> AWAITING_CREDENTIAL -> ESCALATED_SUCCESS | ESCALATED_FAILED
//! ```
//!
//! Waiting for a credential is not a blocking call. `attempt` hands back a
//! [`ResumeToken`] and returns; the interactive layer later calls
//! [`EscalationController::resume`] with the credential. The credential goes
//! to the elevation helper on stdin only, never on the command line, and is
//! wiped from memory once the run is over.

use crate::executor::{CommandRunner, ExecutionResult};
use crate::permission::{credential_rejected, needs_escalation, requires_credential};
use crate::tokenizer::{starts_with_elevation, strip_elevation, tokenize};
use shared::settings::{AppSettings, ElevationSettings};
use shared::PipelineError;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use zeroize::Zeroizing;

const REDACTED: &str = "[REDACTED]";

// Minimum credential length that gets masked in output
const MIN_REDACTED_LEN: usize = 6;

/// A secret typed by the user for a single elevated run.
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    fn expose(&self) -> &str {
        &self.0
    }

    /// Credential plus the newline the helper waits for.
    fn to_stdin(&self) -> Zeroizing<Vec<u8>> {
        let mut input = Zeroizing::new(Vec::with_capacity(self.0.len() + 1));
        input.extend_from_slice(self.0.as_bytes());
        input.push(b'\n');
        input
    }
}

impl From<Zeroizing<String>> for Credential {
    fn from(secret: Zeroizing<String>) -> Self {
        Self(secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Where a command's lifecycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Success,
    Failed,
    EscalatedSuccess,
    EscalatedFailed,
}

impl TerminalState {
    pub fn escalated(self) -> bool {
        matches!(self, TerminalState::EscalatedSuccess | TerminalState::EscalatedFailed)
    }

    pub fn succeeded(self) -> bool {
        matches!(self, TerminalState::Success | TerminalState::EscalatedSuccess)
    }
}

/// Final, structured result of a command.
#[derive(Debug)]
pub struct CommandReport {
    pub command: String,
    pub state: TerminalState,
    /// The run that decided the outcome, or why no run happened
    pub result: Result<ExecutionResult, PipelineError>,
    /// The elevation helper said the credential was wrong
    pub credential_rejected: bool,
}

impl CommandReport {
    fn new(
        command: &str,
        state: TerminalState,
        result: Result<ExecutionResult, PipelineError>,
    ) -> Self {
        Self {
            command: command.to_string(),
            state,
            result,
            credential_rejected: false,
        }
    }

    fn from_run(
        command: &str,
        escalated: bool,
        result: Result<ExecutionResult, PipelineError>,
    ) -> Self {
        let succeeded = matches!(&result, Ok(r) if r.success());
        let state = match (escalated, succeeded) {
            (false, true) => TerminalState::Success,
            (false, false) => TerminalState::Failed,
            (true, true) => TerminalState::EscalatedSuccess,
            (true, false) => TerminalState::EscalatedFailed,
        };
        Self::new(command, state, result)
    }

    pub fn escalated(&self) -> bool {
        self.state.escalated()
    }

    pub fn succeeded(&self) -> bool {
        self.state.succeeded()
    }
}

impl fmt::Display for CommandReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(result) if result.success() => {
                write!(f, "Command executed successfully:\n{}", result.stdout)
            }
            Ok(result) => write!(f, "Command failed:\n{}", result.stderr),
            Err(e) => write!(f, "{}", e),
        }
    }
}

/// Proof that a command is parked waiting for a credential.
///
/// Not `Clone`: resuming consumes it, so one denial buys one elevated re-run.
#[derive(Debug)]
pub struct ResumeToken {
    id: Uuid,
    command: String,
}

impl ResumeToken {
    fn new(command: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            command: command.to_string(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// What `attempt` produced
#[derive(Debug)]
pub enum Attempt {
    Finished(CommandReport),
    AwaitingCredential(ResumeToken),
}

pub struct EscalationController {
    runner: Arc<dyn CommandRunner>,
    elevation: ElevationSettings,
    denial_signatures: Vec<String>,
}

impl EscalationController {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: &AppSettings) -> Self {
        Self {
            runner,
            elevation: settings.elevation.clone(),
            denial_signatures: settings.denial_signatures.clone(),
        }
    }

    /// Run a freshly received command.
    pub async fn attempt(&self, command: &str) -> Attempt {
        let command = command.trim();
        let argv = match tokenize(command) {
            Ok(argv) => argv,
            Err(e) => {
                return Attempt::Finished(CommandReport::new(command, TerminalState::Failed, Err(e)))
            }
        };

        if starts_with_elevation(&argv, &self.elevation.keyword) {
            return self.attempt_already_elevated(command, &argv).await;
        }

        match self.runner.run(&argv, None).await {
            Ok(result) if needs_escalation(&result, &self.denial_signatures) => {
                tracing::warn!(
                    program = %argv[0],
                    exit_status = result.exit_status,
                    "permission denied, waiting for credential to retry elevated"
                );
                Attempt::AwaitingCredential(ResumeToken::new(command))
            }
            result => Attempt::Finished(CommandReport::from_run(command, false, result)),
        }
    }

    /// Commands that arrive elevated get exactly one run, without a credential.
    async fn attempt_already_elevated(&self, command: &str, argv: &[String]) -> Attempt {
        let inner = strip_elevation(argv, &self.elevation.keyword);
        if inner.is_empty() {
            return Attempt::Finished(CommandReport::new(
                command,
                TerminalState::EscalatedFailed,
                Err(self.nothing_to_elevate()),
            ));
        }

        let mut elevated = vec![self.elevation.keyword.clone()];
        elevated.extend(self.elevation.non_interactive_flag.iter().cloned());
        elevated.extend(inner);

        match self.runner.run(&elevated, None).await {
            Ok(result)
                if requires_credential(&result, &self.elevation.credential_required_signatures) =>
            {
                tracing::info!("elevation helper needs a credential");
                Attempt::AwaitingCredential(ResumeToken::new(command))
            }
            result => Attempt::Finished(CommandReport::from_run(command, true, result)),
        }
    }

    /// Continue a parked command with the user's credential.
    pub async fn resume(&self, token: ResumeToken, credential: Credential) -> CommandReport {
        self.run_elevated(&token.command, credential).await
    }

    /// Run `command` through the elevation helper, feeding `credential` on stdin.
    pub async fn run_elevated(&self, command: &str, credential: Credential) -> CommandReport {
        let command = command.trim();
        let argv = match tokenize(command) {
            Ok(argv) => argv,
            Err(e) => return CommandReport::new(command, TerminalState::EscalatedFailed, Err(e)),
        };

        let inner = strip_elevation(&argv, &self.elevation.keyword);
        if inner.is_empty() {
            return CommandReport::new(
                command,
                TerminalState::EscalatedFailed,
                Err(self.nothing_to_elevate()),
            );
        }

        tracing::info!(program = %inner[0], "running with elevated privileges");

        let mut elevated = vec![
            self.elevation.keyword.clone(),
            self.elevation.stdin_flag.clone(),
        ];
        elevated.extend(self.elevation.extra_flags.iter().cloned());
        elevated.extend(inner);

        let input = credential.to_stdin();
        let outcome = self.runner.run(&elevated, Some(input.as_slice())).await;
        drop(input);

        let result = match outcome {
            Ok(result) => result,
            Err(e) => return CommandReport::new(command, TerminalState::EscalatedFailed, Err(e)),
        };

        let result = self.sanitize(result, &credential);
        // A successful target may print these phrases itself
        let rejected = !result.success()
            && credential_rejected(&result, &self.elevation.rejected_credential_signatures);
        if rejected {
            tracing::warn!("elevation helper rejected the credential");
        }

        let mut report = CommandReport::from_run(command, true, Ok(result));
        report.credential_rejected = rejected;
        report
    }

    fn nothing_to_elevate(&self) -> PipelineError {
        PipelineError::parse(format!(
            "Invalid command structure after removing `{}`",
            self.elevation.keyword
        ))
    }

    /// Drop helper prompts from stderr and mask any echo of the credential.
    fn sanitize(&self, result: ExecutionResult, credential: &Credential) -> ExecutionResult {
        let stderr = strip_prompts(&result.stderr, &self.elevation.prompt_markers);
        ExecutionResult {
            stdout: redact(&result.stdout, credential),
            stderr: redact(&stderr, credential),
            ..result
        }
    }
}

/// Remove `[sudo] password for user: ` style prompts.
///
/// Only a line that starts with a marker is treated as a prompt. The helper
/// prints its prompt without a newline, so whatever it writes next lands on
/// the same line; only the prompt itself is cut.
fn strip_prompts(stderr: &str, markers: &[String]) -> String {
    let is_prompt = |text: &str| {
        markers
            .iter()
            .any(|m| !m.is_empty() && text.starts_with(m.as_str()))
    };
    let mut out = String::with_capacity(stderr.len());

    for line in stderr.split_inclusive('\n') {
        let mut rest = line;
        while is_prompt(rest) {
            match rest.find(": ") {
                Some(end) => rest = &rest[end + 2..],
                None => break,
            }
        }
        // Drop lines emptied by prompt removal
        if rest.len() != line.len() && rest.trim().is_empty() {
            continue;
        }
        out.push_str(rest);
    }

    out
}

/// Mask the credential wherever the helper or target echoed it.
///
/// Credentials shorter than `MIN_REDACTED_LEN` are left alone: masking a
/// password like `root` would rewrite every path and user name that contains
/// it, and the text is only shown to the user who typed it.
fn redact(text: &str, credential: &Credential) -> String {
    if credential.expose().chars().count() < MIN_REDACTED_LEN {
        return text.to_string();
    }
    text.replace(credential.expose(), REDACTED)
}

//! Agent Host - turns prompts into commands and runs them
//!
//! This crate provides:
//! - Tokenizing AI-generated command strings without a shell
//! - Running commands as direct child processes
//! - Detecting permission denials and re-running elevated
//! - The prompt pipeline tying the completion endpoint, history and log together

pub mod escalation;
pub mod executor;
pub mod permission;
pub mod prompts;
pub mod tokenizer;

#[cfg(test)]
mod testing;

pub use escalation::{
    Attempt, CommandReport, Credential, EscalationController, ResumeToken, TerminalState,
};
pub use executor::{CommandRunner, ExecutionResult, ProcessRunner};
pub use permission::needs_escalation;
pub use prompts::default_system_message;
pub use tokenizer::tokenize;

use providers::{CompletionClient, HttpCompletionClient};
use services::{CommandHistoryStore, ConversationLog, FileCommandHistory, JsonConversationLog};
use shared::agent_api::Role;
use shared::settings::AppSettings;
use shared::PipelineError;
use std::sync::Arc;

/// Result of one user prompt
#[derive(Debug)]
pub enum PromptOutcome {
    /// The command ran (or could not be run) and nothing is pending
    Completed(CommandReport),
    /// The command was denied; call [`AgentHost::submit_credential`] to retry elevated
    AwaitingCredential(ResumeToken),
    /// No command was obtained or it could not be recorded, so nothing ran
    Unavailable(PipelineError),
}

/// Agent host manages the prompt -> command -> execution pipeline
pub struct AgentHost {
    completion: Arc<dyn CompletionClient>,
    history: Arc<dyn CommandHistoryStore>,
    log: Arc<dyn ConversationLog>,
    controller: EscalationController,
}

impl AgentHost {
    pub fn new(
        settings: &AppSettings,
        completion: Arc<dyn CompletionClient>,
        history: Arc<dyn CommandHistoryStore>,
        log: Arc<dyn ConversationLog>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let controller = EscalationController::new(runner, settings);
        Self {
            completion,
            history,
            log,
            controller,
        }
    }

    /// Wire up the HTTP client, file-backed stores and real processes.
    pub fn from_settings(settings: AppSettings) -> Result<Self, PipelineError> {
        let completion = Arc::new(HttpCompletionClient::from_settings(&settings.completion)?);
        let history = Arc::new(FileCommandHistory::new(settings.history_file.clone()));
        let system_message = settings
            .system_message
            .clone()
            .unwrap_or_else(default_system_message);
        let log = Arc::new(JsonConversationLog::new(
            settings.conversation_log.clone(),
            system_message,
        ));
        Ok(Self::new(&settings, completion, history, log, Arc::new(ProcessRunner)))
    }

    /// Run one user prompt through the pipeline.
    ///
    /// Only conversation log failures come back as `Err`; losing history
    /// silently is worse than stopping. Everything else is folded into the
    /// outcome.
    pub async fn handle_prompt(&self, prompt: &str) -> Result<PromptOutcome, PipelineError> {
        self.log.append(Role::User, prompt.trim())?;
        let conversation = self.log.entries()?;

        let command = match self.completion.complete(&conversation).await {
            Ok(command) if command.trim().is_empty() => {
                tracing::warn!("completion returned an empty command");
                return Ok(PromptOutcome::Unavailable(PipelineError::Shape(
                    "empty command".to_string(),
                )));
            }
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(error = %e, "completion request failed");
                return Ok(PromptOutcome::Unavailable(e));
            }
        };

        // Without a stored copy a later credential could not find the command
        if let Err(e) = self.history.save(&command) {
            tracing::warn!(error = %e, "could not store command, not running it");
            return Ok(PromptOutcome::Unavailable(e));
        }

        let attempt = self.controller.attempt(&command).await;
        self.log.append(Role::Assistant, &command)?;

        Ok(match attempt {
            Attempt::Finished(report) => {
                tracing::info!(
                    state = ?report.state,
                    escalated = report.escalated(),
                    "command finished"
                );
                PromptOutcome::Completed(report)
            }
            Attempt::AwaitingCredential(token) => PromptOutcome::AwaitingCredential(token),
        })
    }

    /// Resume a parked command with the user's credential.
    ///
    /// The stored last command is what gets re-run; the token's copy is only
    /// used when the store comes back empty.
    pub async fn submit_credential(
        &self,
        token: ResumeToken,
        credential: Credential,
    ) -> CommandReport {
        match self.history.load() {
            Some(stored) => {
                if stored != token.command() {
                    tracing::warn!(token = %token.id(), "stored command differs from the parked one");
                }
                self.controller.run_elevated(&stored, credential).await
            }
            None => {
                tracing::warn!(token = %token.id(), "no stored command, using the parked copy");
                self.controller.resume(token, credential).await
            }
        }
    }

    /// The last command received from the completion endpoint.
    pub fn last_command(&self) -> Option<String> {
        self.history.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedCompletion, ScriptedRunner};
    use services::{MemoryCommandHistory, MemoryConversationLog};
    use shared::agent_api::ChatMessage;

    struct Harness {
        host: AgentHost,
        completion: Arc<FixedCompletion>,
        history: Arc<dyn CommandHistoryStore>,
        log: Arc<MemoryConversationLog>,
        runner: Arc<ScriptedRunner>,
    }

    fn harness_with(completion: FixedCompletion, history: Arc<dyn CommandHistoryStore>) -> Harness {
        let completion = Arc::new(completion);
        let log = Arc::new(MemoryConversationLog::new("seed"));
        let runner = Arc::new(ScriptedRunner::new());
        let host = AgentHost::new(
            &AppSettings::default(),
            completion.clone(),
            history.clone(),
            log.clone(),
            runner.clone(),
        );
        Harness {
            host,
            completion,
            history,
            log,
            runner,
        }
    }

    fn harness(command: &str) -> Harness {
        harness_with(
            FixedCompletion::command(command),
            Arc::new(MemoryCommandHistory::new()),
        )
    }

    #[tokio::test]
    async fn test_prompt_runs_command_and_logs_turns() {
        let h = harness("uname -s");
        h.runner.push_ok(0, "Linux\n", "");

        let outcome = h.host.handle_prompt("what kernel is this?").await.unwrap();

        let PromptOutcome::Completed(report) = outcome else {
            panic!("expected completed outcome");
        };
        assert_eq!(report.state, TerminalState::Success);
        assert_eq!(report.to_string(), "Command executed successfully:\nLinux\n");

        // Endpoint saw the seed plus the new user turn
        assert_eq!(
            h.completion.seen(),
            vec![vec![
                ChatMessage::system("seed"),
                ChatMessage::user("what kernel is this?"),
            ]]
        );
        assert_eq!(
            h.log.entries().unwrap(),
            vec![
                ChatMessage::system("seed"),
                ChatMessage::user("what kernel is this?"),
                ChatMessage::assistant("uname -s"),
            ]
        );
        assert_eq!(h.history.load(), Some("uname -s".to_string()));
    }

    #[tokio::test]
    async fn test_denied_command_waits_then_escalates_with_stored_command() {
        let h = harness("cat /etc/shadow");
        h.runner.push_ok(1, "", "cat: /etc/shadow: Permission denied\n");
        h.runner.push_ok(0, "root:*:19000::::::\n", "");

        let outcome = h.host.handle_prompt("show me the shadow file").await.unwrap();
        let PromptOutcome::AwaitingCredential(token) = outcome else {
            panic!("expected to wait for a credential");
        };
        assert_eq!(h.runner.call_count(), 1);
        // The assistant turn is recorded even while waiting
        assert_eq!(h.log.entries().unwrap().len(), 3);

        let report = h
            .host
            .submit_credential(token, Credential::new("hunter2"))
            .await;

        assert_eq!(report.state, TerminalState::EscalatedSuccess);
        let calls = h.runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0[..2], ["sudo".to_string(), "-S".to_string()]);
        assert_eq!(calls[1].1.as_deref(), Some(b"hunter2\n".as_slice()));
        assert!(!report.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_submit_credential_prefers_stored_command() {
        let h = harness("cat /etc/shadow");
        h.runner.push_ok(1, "", "Permission denied\n");
        h.runner.push_ok(0, "", "");

        let PromptOutcome::AwaitingCredential(token) =
            h.host.handle_prompt("shadow").await.unwrap()
        else {
            panic!("expected to wait for a credential");
        };

        h.history.save("sudo cat /etc/gshadow").unwrap();
        h.host.submit_credential(token, Credential::new("pw")).await;

        assert_eq!(
            h.runner.calls()[1].0,
            vec!["sudo", "-S", "-k", "cat", "/etc/gshadow"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_completion_failure_is_unavailable() {
        let h = harness_with(
            FixedCompletion::failing("connection refused"),
            Arc::new(MemoryCommandHistory::new()),
        );

        let outcome = h.host.handle_prompt("list files").await.unwrap();

        match outcome {
            PromptOutcome::Unavailable(e) => {
                assert_eq!(e.to_string(), "Request error: connection refused")
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
        assert_eq!(h.runner.call_count(), 0);
        assert_eq!(h.log.entries().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_completion_keeps_previous_command() {
        let h = harness("   ");
        h.history.save("df -h").unwrap();

        let outcome = h.host.handle_prompt("anything").await.unwrap();

        assert!(matches!(
            outcome,
            PromptOutcome::Unavailable(PipelineError::Shape(_))
        ));
        assert_eq!(h.history.load(), Some("df -h".to_string()));
        assert_eq!(h.runner.call_count(), 0);
        // Only the seed and the user turn; no empty assistant entry
        assert_eq!(h.log.entries().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unset_history_blocks_execution() {
        let h = harness_with(
            FixedCompletion::command("rm -rf build"),
            Arc::new(FileCommandHistory::new(None)),
        );

        let outcome = h.host.handle_prompt("clean the build").await.unwrap();

        assert!(matches!(
            outcome,
            PromptOutcome::Unavailable(PipelineError::Config(_))
        ));
        assert_eq!(h.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_log_propagates() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("messages.json");
        std::fs::write(&path, "[{\"role\": \"user\"").unwrap();

        let runner = Arc::new(ScriptedRunner::new());
        let host = AgentHost::new(
            &AppSettings::default(),
            Arc::new(FixedCompletion::command("ls")),
            Arc::new(MemoryCommandHistory::new()),
            Arc::new(JsonConversationLog::new(path, "seed")),
            runner.clone(),
        );

        let err = host.handle_prompt("list").await.unwrap_err();
        assert!(matches!(err, PipelineError::CorruptLog { .. }));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_last_command_reads_history() {
        let h = harness("df -h");
        h.runner.push_ok(0, "", "");
        assert_eq!(h.host.last_command(), None);
        h.host.handle_prompt("disk").await.unwrap();
        assert_eq!(h.host.last_command(), Some("df -h".to_string()));
    }
}

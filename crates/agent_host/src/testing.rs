//! Test doubles shared by the unit tests in this crate.

use crate::executor::{CommandRunner, ExecutionResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use providers::CompletionClient;
use shared::agent_api::ChatMessage;
use shared::PipelineError;
use std::collections::VecDeque;

type Call = (Vec<String>, Option<Vec<u8>>);

/// Runner that replays queued results and records every invocation.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<Call>>,
    responses: Mutex<VecDeque<Result<ExecutionResult, PipelineError>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, exit_status: i32, stdout: &str, stderr: &str) {
        self.responses.lock().push_back(Ok(ExecutionResult {
            exit_status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration_ms: 1,
        }));
    }

    pub fn push_spawn_error(&self, program: &str) {
        self.responses.lock().push_back(Err(PipelineError::Spawn {
            program: program.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        }));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        argv: &[String],
        input: Option<&[u8]>,
    ) -> Result<ExecutionResult, PipelineError> {
        self.calls
            .lock()
            .push((argv.to_vec(), input.map(<[u8]>::to_vec)));
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected run of {:?}", argv))
    }
}

/// Completion client that returns a fixed reply and remembers what it was sent.
pub struct FixedCompletion {
    reply: Result<String, String>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FixedCompletion {
    pub fn command(command: &str) -> Self {
        Self {
            reply: Ok(command.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl CompletionClient for FixedCompletion {
    async fn complete(&self, conversation: &[ChatMessage]) -> Result<String, PipelineError> {
        self.seen.lock().push(conversation.to_vec());
        self.reply
            .clone()
            .map_err(PipelineError::Transport)
    }
}

//! Process runner
//!
//! Runs an argument vector as a direct child process and captures its
//! output. No shell is ever involved: `argv[0]` is spawned with `argv[1..]`
//! as literal arguments.

use async_trait::async_trait;
use shared::PipelineError;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Outcome of one process run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code (-1 when the platform reports none, e.g. killed by a signal)
    pub exit_status: i32,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Wall-clock duration
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Something that can run an argument vector.
///
/// `input`, when given, is written to the child's stdin and the pipe is then
/// closed; otherwise stdin is empty.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        argv: &[String],
        input: Option<&[u8]>,
    ) -> Result<ExecutionResult, PipelineError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        argv: &[String],
        input: Option<&[u8]>,
    ) -> Result<ExecutionResult, PipelineError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| PipelineError::parse("empty command"))?;

        let spawn_error = |source: std::io::Error| PipelineError::Spawn {
            program: program.clone(),
            source,
        };

        let start = Instant::now();

        // kill_on_drop: a child is never left running if this future is dropped
        // or we bail out before waiting on it.
        let mut child = Command::new(program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        if let Some(input) = input {
            if let Some(mut stdin) = child.stdin.take() {
                match stdin.write_all(input).await {
                    Ok(()) => {}
                    // Child exited without reading; its status still tells the story
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                    Err(e) => return Err(spawn_error(e)),
                }
                // Close stdin so the child sees EOF
                drop(stdin);
            }
        }

        let output = child.wait_with_output().await.map_err(spawn_error)?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = ExecutionResult {
            exit_status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        };

        tracing::debug!(
            program = %program,
            exit_status = result.exit_status,
            duration_ms,
            "process finished"
        );

        Ok(result)
    }
}

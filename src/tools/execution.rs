#![allow(clippy::result_large_err)] // Runners return AppError so spawn diagnostics reach the caller unboxed.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Cap on stderr carried into error context. Stdout is always read in full.
const DIAGNOSTIC_CAPTURE_LIMIT_BYTES: usize = 8 * 1_048_576;

/// One external process invocation. Arguments are passed verbatim, never through a shell.
#[derive(Clone, Debug, Default)]
pub struct CommandExecutionRequest {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandExecutionRequest {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program and arguments joined for log lines.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandExecutionOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl CommandExecutionOutput {
    /// The complete stdout, rejected when it is not valid UTF-8.
    pub fn stdout_utf8(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.stdout.clone())
    }

    /// Lossy stderr, capped for use in diagnostics.
    pub fn stderr_text(&self) -> String {
        let limit = DIAGNOSTIC_CAPTURE_LIMIT_BYTES.min(self.stderr.len());
        String::from_utf8_lossy(&self.stderr[..limit]).into_owned()
    }
}

/// Seam for running external tools; tests substitute canned output.
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    /// Runs the process to completion. Only a failure to start the process is an error;
    /// a non-zero exit code is reported through the output.
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError> {
        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(command = %request.display(), "spawning external tool");
        let start = Instant::now();
        let output = command.output().await.map_err(|err| {
            let mut error = AppError::new(
                ErrorCategory::ToolExecutionError,
                format!("failed to execute {}: {}", request.program, err),
            )
            .with_code("MS-EXEC-001");
            error.add_context("command", &request.display());
            error
        })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!(
            program = %request.program,
            exit_code,
            duration_ms,
            "external tool finished"
        );

        Ok(CommandExecutionOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code,
            duration_ms,
        })
    }
}

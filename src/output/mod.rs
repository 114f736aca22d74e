#![allow(clippy::result_large_err)] // Output actions return AppError so write failures keep their code and path.

//! Consumers of a finished run: artifact and error files, action-host step outputs and the
//! final verdict.

use crate::core::config::OutputConfig;
use crate::core::error::AppError;
use crate::core::pipeline::PipelineOutcome;
use crate::core::types::ErrorCategory;
use crate::logging::ExecutionContext;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Writes the (possibly invalid) artifact and the error report wherever configured.
#[derive(Debug, Clone, Default)]
pub struct OutputActions {
    manifest_path: Option<PathBuf>,
    errors_path: Option<PathBuf>,
    step_output: Option<PathBuf>,
}

impl OutputActions {
    /// Step outputs are only written in the action host, to the file named by `GITHUB_OUTPUT`.
    pub fn new(config: &OutputConfig, context: ExecutionContext) -> Self {
        let step_output = if context.is_action_host() {
            std::env::var_os("GITHUB_OUTPUT")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        } else {
            None
        };
        Self {
            manifest_path: config.manifest_path.clone(),
            errors_path: config.errors_path.clone(),
            step_output,
        }
    }

    pub fn with_step_output(mut self, path: Option<PathBuf>) -> Self {
        self.step_output = path;
        self
    }

    pub fn apply(&self, outcome: &PipelineOutcome) -> Result<(), AppError> {
        if let Some(path) = &self.manifest_path {
            write_file(path, &outcome.artifact, "MS-OUT-001")?;
            tracing::info!(path = %path.display(), "wrote manifest artifact");
        }

        let report = error_report(outcome);
        if let Some(path) = &self.errors_path {
            write_file(path, &report, "MS-OUT-002")?;
            tracing::info!(path = %path.display(), errors = outcome.errors.len(), "wrote error report");
        }

        if let Some(path) = &self.step_output {
            let mut entries = String::new();
            if let Some(manifest) = &self.manifest_path {
                entries.push_str(&format!("manifest={}\n", manifest.display()));
            }
            let delimiter = format!("MS_EOF_{}", Uuid::new_v4().simple());
            entries.push_str(&format!("errors<<{}\n", delimiter));
            entries.push_str(&report);
            entries.push_str(&format!("{}\n", delimiter));
            append_file(path, &entries)?;
            tracing::debug!(path = %path.display(), "appended step outputs");
        }

        Ok(())
    }
}

/// One line per error, each terminated by a newline.
pub fn error_report(outcome: &PipelineOutcome) -> String {
    outcome
        .error_messages()
        .iter()
        .map(|message| format!("{}\n", message))
        .collect()
}

/// Final verdict of the run. In the action host a failure is also printed as an
/// `::error::` workflow command on stdout.
pub fn report(outcome: &PipelineOutcome, context: ExecutionContext) -> Result<(), AppError> {
    let verdict = outcome.verdict();
    match (&verdict, outcome.failure_reason()) {
        (Err(_), Some(reason)) if context.is_action_host() => {
            println!("::error::{}", escape_workflow_command(&reason));
        }
        (Err(err), _) => {
            tracing::error!(code = %err.code, errors = outcome.errors.len(), "manifest validation failed");
        }
        (Ok(()), _) => tracing::info!("manifests are valid"),
    }
    verdict
}

/// Escape message data for a workflow command.
pub fn escape_workflow_command(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn write_file(path: &Path, content: &str, code: &str) -> Result<(), AppError> {
    ensure_parent(path, code)?;
    fs::write(path, content).map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to write {}: {}", path.display(), err),
        )
        .with_code(code)
    })
}

fn append_file(path: &Path, content: &str) -> Result<(), AppError> {
    let io_error = |err: std::io::Error| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to append step outputs to {}: {}", path.display(), err),
        )
        .with_code("MS-OUT-003")
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;
    file.write_all(content.as_bytes()).map_err(io_error)
}

fn ensure_parent(path: &Path, code: &str) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| {
                AppError::new(
                    ErrorCategory::IoError,
                    format!("failed to create directory {}: {}", parent.display(), err),
                )
                .with_code(code)
            })
        }
        _ => Ok(()),
    }
}

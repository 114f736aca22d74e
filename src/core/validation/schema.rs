#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::tools::execution::{CommandExecutionRequest, CommandRunner, TokioCommandRunner};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;

/// Validates the serialized artifact against Kubernetes schemas.
///
/// Findings come back as preformatted strings. Only a validator that cannot run at all
/// returns an error.
#[async_trait]
pub trait SchemaValidator: Send + Sync {
    async fn validate(&self, artifact: &str) -> Result<Vec<String>, AppError>;
}

/// Used when schema validation is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSchemaValidator;

#[async_trait]
impl SchemaValidator for NoopSchemaValidator {
    async fn validate(&self, _artifact: &str) -> Result<Vec<String>, AppError> {
        Ok(Vec::new())
    }
}

pub struct KubeconformValidator {
    binary: String,
    args: Vec<String>,
    runner: Arc<dyn CommandRunner>,
}

impl KubeconformValidator {
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self::with_runner(binary, args, Arc::new(TokioCommandRunner))
    }

    pub fn with_runner(
        binary: impl Into<String>,
        args: Vec<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            binary: binary.into(),
            args,
            runner,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    resources: Vec<ResourceReport>,
}

#[derive(Debug, Deserialize)]
struct ResourceReport {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    msg: String,
    #[serde(default, rename = "validationErrors")]
    validation_errors: Vec<ValidationErrorReport>,
}

#[derive(Debug, Deserialize)]
struct ValidationErrorReport {
    #[serde(default)]
    path: String,
    #[serde(default)]
    msg: String,
}

impl KubeconformValidator {
    fn exit_failure(&self, exit_code: i32, stderr: &str) -> AppError {
        let mut error = AppError::new(
            ErrorCategory::ToolExecutionError,
            format!(
                "schema validator '{}' exited with code {}",
                self.binary, exit_code
            ),
        )
        .with_code("MS-SCHEMA-002");
        error.add_context("stderr", stderr.trim_end());
        error
    }
}

#[async_trait]
impl SchemaValidator for KubeconformValidator {
    async fn validate(&self, artifact: &str) -> Result<Vec<String>, AppError> {
        let mut file = tempfile::Builder::new()
            .prefix("manifest-sentry-")
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(artifact.as_bytes())?;
        file.flush()?;

        let request = CommandExecutionRequest::new(&self.binary)
            .args(self.args.iter().cloned())
            .args(["-output", "json"])
            .arg(file.path().display().to_string());
        let output = self.runner.run(&request).await.map_err(|err| {
            let mut error = AppError::new(
                ErrorCategory::ToolExecutionError,
                format!("schema validator '{}' could not be started", self.binary),
            )
            .with_code("MS-SCHEMA-001");
            error.add_context("cause", &err.message);
            error
        })?;

        if !matches!(output.exit_code, 0 | 1) {
            return Err(self.exit_failure(output.exit_code, &output.stderr_text()));
        }

        let stdout = output.stdout_utf8().map_err(|e| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("schema validator output is not UTF-8: {}", e.utf8_error()),
            )
            .with_code("MS-SCHEMA-003")
        })?;
        let findings = parse_report(&stdout)?;
        // Exit 1 means invalid resources; without any reported one the tool itself failed.
        if output.exit_code == 1 && findings.is_empty() {
            return Err(self.exit_failure(output.exit_code, &output.stderr_text()));
        }
        tracing::debug!(findings = findings.len(), "schema validation finished");
        Ok(findings)
    }
}

fn parse_report(stdout: &str) -> Result<Vec<String>, AppError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let report: Report = serde_json::from_str(stdout).map_err(|e| {
        AppError::new(
            ErrorCategory::SerializationError,
            format!("schema validator output is not a JSON report: {}", e),
        )
        .with_code("MS-SCHEMA-003")
    })?;

    let mut findings = Vec::new();
    for resource in report.resources {
        if resource.status != "statusInvalid" && resource.status != "statusError" {
            continue;
        }
        let subject = format!("{}/{}", resource.kind, resource.name);
        if resource.validation_errors.is_empty() {
            findings.push(format!("{}: {}", subject, resource.msg));
            continue;
        }
        for detail in resource.validation_errors {
            if detail.path.is_empty() {
                findings.push(format!("{}: {}", subject, detail.msg));
            } else {
                findings.push(format!("{} {}: {}", subject, detail.path, detail.msg));
            }
        }
    }
    Ok(findings)
}

#![allow(clippy::result_large_err)]

use super::execution::{CommandExecutionRequest, CommandRunner, TokioCommandRunner};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

/// Inputs of one templating run.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub target: PathBuf,
    pub extra_resources: Vec<PathBuf>,
    pub extra_args: Vec<String>,
}

impl RenderRequest {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }
}

/// Produces raw multi-document YAML for a render request.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<String, AppError>;
}

/// Runs `<binary> build <target> <extra_args…>`.
pub struct KustomizeRenderer {
    binary: String,
    runner: Arc<dyn CommandRunner>,
}

impl KustomizeRenderer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self::with_runner(binary, Arc::new(TokioCommandRunner))
    }

    pub fn with_runner(binary: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

#[derive(Serialize)]
struct Kustomization {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    kind: &'static str,
    resources: Vec<String>,
}

#[async_trait]
impl Renderer for KustomizeRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, AppError> {
        // Held until the tool exits; dropping it removes the generated overlay.
        let staging = if request.extra_resources.is_empty() {
            None
        } else {
            Some(stage_overlay(request).await?)
        };
        let target = staging
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .unwrap_or_else(|| request.target.clone());

        let mut command = CommandExecutionRequest::new(&self.binary)
            .arg("build")
            .arg(target.display().to_string())
            .args(request.extra_args.iter().cloned());
        if staging.is_some() {
            command = command.args(["--load-restrictor", "LoadRestrictionsNone"]);
        }

        tracing::info!(
            target = %request.target.display(),
            extra_resources = request.extra_resources.len(),
            "rendering manifests"
        );
        let output = self.runner.run(&command).await.map_err(|err| {
            let mut error = AppError::new(
                ErrorCategory::ToolExecutionError,
                format!("templating tool '{}' could not be started", self.binary),
            )
            .with_code("MS-RENDER-001");
            error.add_context("cause", &err.message);
            error
        })?;

        if output.exit_code != 0 {
            let mut error = AppError::new(
                ErrorCategory::ToolExecutionError,
                format!(
                    "templating tool '{}' exited with code {}",
                    self.binary, output.exit_code
                ),
            )
            .with_code("MS-RENDER-002");
            error.add_context("stderr", output.stderr_text().trim_end());
            error.add_context("command", &command.display());
            return Err(error);
        }

        output.stdout_utf8().map_err(|err| {
            let mut error = AppError::new(
                ErrorCategory::SerializationError,
                format!("templating tool '{}' produced non UTF-8 output", self.binary),
            )
            .with_code("MS-RENDER-004");
            error.add_context("cause", &err.utf8_error().to_string());
            error.add_context("command", &command.display());
            error
        })
    }
}

/// Temporary overlay listing the target and every extra resource.
async fn stage_overlay(request: &RenderRequest) -> Result<TempDir, AppError> {
    let dir = tempfile::Builder::new()
        .prefix("manifest-sentry-")
        .tempdir()?;
    let resources = std::iter::once(&request.target)
        .chain(request.extra_resources.iter())
        .map(|path| absolute(path).map(|p| p.display().to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    let kustomization = Kustomization {
        api_version: "kustomize.config.k8s.io/v1beta1",
        kind: "Kustomization",
        resources,
    };
    let text = serde_yaml::to_string(&kustomization).map_err(|e| {
        AppError::new(
            ErrorCategory::SerializationError,
            format!("failed to build staging kustomization: {}", e),
        )
        .with_code("MS-RENDER-003")
    })?;
    tokio::fs::write(dir.path().join(KUSTOMIZATION_FILE), text).await?;
    tracing::debug!(dir = %dir.path().display(), "staged overlay with extra resources");
    Ok(dir)
}

fn absolute(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

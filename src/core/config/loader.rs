#![allow(clippy::result_large_err)]

use super::SentryConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "manifest-sentry.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/manifest-sentry.toml)
    /// Environment variables override config file values
    /// A missing file means defaults + env vars
    pub fn load_from_workspace(workspace_path: &Path) -> Result<SentryConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load an explicitly named config file, which must exist.
    pub fn load_explicit(path: &Path) -> Result<SentryConfig, AppError> {
        let mut config = Self::load_from_file(path)?.ok_or_else(|| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("config file {} does not exist", path.display()),
            )
            .with_code("MS-CFG-001")
        })?;
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<SentryConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_code("MS-CFG-001")
        })?;

        let config: SentryConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("MS-CFG-001")
        })?;

        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    /// Environment variables take precedence over config file values
    fn apply_env_overrides(config: &mut SentryConfig) {
        if let Some(verbose) = env_bool("MANIFEST_SENTRY_VERBOSE") {
            config.verbose = verbose;
        }

        if let Ok(binary) = env::var("MANIFEST_SENTRY_RENDER_BINARY") {
            config.render.binary = binary;
        }

        if let Ok(binary) = env::var("MANIFEST_SENTRY_SCHEMA_BINARY") {
            config.schema.binary = binary;
        }

        if let Some(enabled) = env_bool("MANIFEST_SENTRY_SCHEMA_ENABLED") {
            config.schema.enabled = enabled;
        }

        if let Ok(allowed) = env::var("MANIFEST_SENTRY_ALLOWED_SECRETS") {
            config.secrets.allowed = allowed
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(path) = env::var("MANIFEST_SENTRY_OUTPUT_MANIFEST") {
            config.output.manifest_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = env::var("MANIFEST_SENTRY_OUTPUT_ERRORS") {
            config.output.errors_path = Some(PathBuf::from(path));
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "MANIFEST_SENTRY_VERBOSE - Narrate stage boundaries (true/false)",
            "MANIFEST_SENTRY_RENDER_BINARY - Override the templating tool (default: kustomize)",
            "MANIFEST_SENTRY_SCHEMA_BINARY - Override the schema validator (default: kubeconform)",
            "MANIFEST_SENTRY_SCHEMA_ENABLED - Enable or disable schema validation (true/false)",
            "MANIFEST_SENTRY_ALLOWED_SECRETS - Comma separated allowed secret identities",
            "MANIFEST_SENTRY_OUTPUT_MANIFEST - Write the artifact to this file",
            "MANIFEST_SENTRY_OUTPUT_ERRORS - Write the error report to this file",
        ]
    }
}

/// Invalid values are ignored so a stray variable cannot break the run.
fn env_bool(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<bool>().ok())
}

use crate::core::manifest::{default_superfluous_keys, KeyPath};
use crate::core::validation::RuleDefinition;
use crate::logging::ConsoleOutput;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration loaded from `manifest-sentry.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SentryConfig {
    /// Narrate every stage boundary with document and error counts
    #[serde(default)]
    pub verbose: bool,

    /// Binaries that must resolve on PATH before the run starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_binaries: Option<Vec<String>>,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub strip: StripConfig,

    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_rules: Vec<RuleDefinition>,
}

/// Templating tool invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    #[serde(default = "default_render_binary")]
    pub binary: String,

    /// Resources added next to the target through a generated overlay
    #[serde(default)]
    pub extra_resources: Vec<PathBuf>,

    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Superfluous-key deny-list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StripConfig {
    #[serde(default)]
    pub superfluous_keys: Vec<KeyPath>,

    /// Merge `superfluous_keys` with the built-in list instead of replacing it
    #[serde(default = "default_true")]
    pub use_defaults: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SecretsConfig {
    /// `<namespace>/<name>[/<key>]` identities, `*` wildcards allowed
    #[serde(default)]
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_schema_binary")]
    pub binary: String,

    #[serde(default = "default_schema_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors_path: Option<PathBuf>,
}

/// `[logging]` section; unset fields fall back to the logging defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_file: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_output: Option<ConsoleOutput>,
}

// Default functions
fn default_render_binary() -> String {
    "kustomize".to_string()
}

fn default_schema_binary() -> String {
    "kubeconform".to_string()
}

fn default_schema_args() -> Vec<String> {
    vec!["-strict".to_string(), "-ignore-missing-schemas".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            binary: default_render_binary(),
            extra_resources: Vec::new(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for StripConfig {
    fn default() -> Self {
        StripConfig {
            superfluous_keys: Vec::new(),
            use_defaults: true,
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        SchemaConfig {
            enabled: true,
            binary: default_schema_binary(),
            args: default_schema_args(),
        }
    }
}

impl SentryConfig {
    /// Effective deny-list: built-in keys (unless disabled) followed by configured ones.
    pub fn superfluous_keys(&self) -> Vec<KeyPath> {
        let mut keys = if self.strip.use_defaults {
            default_superfluous_keys()
        } else {
            Vec::new()
        };
        for key in &self.strip.superfluous_keys {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// Configured list, or the render binary plus the schema binary when schema checks run.
    pub fn required_binaries(&self) -> Vec<String> {
        if let Some(binaries) = &self.required_binaries {
            return binaries.clone();
        }
        let mut binaries = vec![self.render.binary.clone()];
        if self.schema.enabled {
            binaries.push(self.schema.binary.clone());
        }
        binaries
    }

    /// Immutable snapshot consumed by the pipeline.
    pub fn settings(&self) -> Settings {
        Settings {
            verbose: self.verbose,
            superfluous_keys: self.superfluous_keys(),
            allowed_secrets: self.secrets.allowed.clone(),
            custom_rules: self.custom_rules.clone(),
            required_binaries: self.required_binaries(),
        }
    }
}

/// Read-only configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub verbose: bool,
    pub superfluous_keys: Vec<KeyPath>,
    pub allowed_secrets: Vec<String>,
    pub custom_rules: Vec<RuleDefinition>,
    pub required_binaries: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        SentryConfig::default().settings()
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

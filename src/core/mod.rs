//! Core of the manifest pipeline.
//!
//! ## Modules
//! - `manifest`: document model and the in-place stages (strip, normalize, scan, serialize).
//! - `validation`: schema and custom-rule cooperation over the serialized artifact.
//! - `pipeline`: the sequential orchestrator that accumulates stage errors.
//! - `config`: `manifest-sentry.toml` loading, validation and the run `Settings` snapshot.
//! - `error` / `types`: fatal error type shared by every layer.

pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod types;
pub mod validation;

pub use config::{ConfigLoader, ConfigValidator, SentryConfig, Settings};
pub use error::AppError;
pub use manifest::{Document, DocumentCollection, Stage, StageError};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineState};
pub use types::ErrorCategory;

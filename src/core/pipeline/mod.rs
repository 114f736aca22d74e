#![allow(clippy::result_large_err)]

//! Stage orchestration.
//!
//! One run walks `Rendered → Stripped → Normalized → SecretChecked → Serialized →
//! SchemaValidated → CustomValidated → Done` strictly in order. Findings are appended to an
//! [`ErrorLedger`] and never stop the walk; only an `AppError` returned by a collaborator ends
//! the run early.

use crate::core::config::Settings;
use crate::core::error::AppError;
use crate::core::manifest::{
    serialize_collection, AllowList, DocumentCollection, ErrorLedger, Normalizer, SecretScanner,
    Stage, StageError, ValueStripper,
};
use crate::core::types::ErrorCategory;
use crate::core::validation::{CustomRuleValidator, SchemaValidator};
use crate::tools::render::{RenderRequest, Renderer};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PipelineState {
    Rendered,
    Stripped,
    Normalized,
    SecretChecked,
    Serialized,
    SchemaValidated,
    CustomValidated,
    Done,
}

impl PipelineState {
    pub const ORDER: [PipelineState; 8] = [
        PipelineState::Rendered,
        PipelineState::Stripped,
        PipelineState::Normalized,
        PipelineState::SecretChecked,
        PipelineState::Serialized,
        PipelineState::SchemaValidated,
        PipelineState::CustomValidated,
        PipelineState::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Rendered => "rendered",
            PipelineState::Stripped => "stripped",
            PipelineState::Normalized => "normalized",
            PipelineState::SecretChecked => "secret-checked",
            PipelineState::Serialized => "serialized",
            PipelineState::SchemaValidated => "schema-validated",
            PipelineState::CustomValidated => "custom-validated",
            PipelineState::Done => "done",
        }
    }

    /// Successor state; `Done` has none.
    pub fn next(self) -> Option<PipelineState> {
        let index = Self::ORDER.iter().position(|state| *state == self)?;
        Self::ORDER.get(index + 1).copied()
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed run. Produced even when the error list is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub artifact: String,
    pub errors: Vec<StageError>,
    /// Whether normalization changed any document.
    pub modified: bool,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Newline-joined messages, `None` for a clean run.
    pub fn failure_reason(&self) -> Option<String> {
        if self.is_success() {
            None
        } else {
            Some(self.error_messages().join("\n"))
        }
    }

    /// Turn accumulated findings into the run verdict.
    pub fn verdict(&self) -> Result<(), AppError> {
        match self.failure_reason() {
            None => Ok(()),
            Some(reason) => {
                let mut error = AppError::new(
                    ErrorCategory::ValidationError,
                    format!("manifest validation failed with {} error(s)", self.errors.len()),
                )
                .with_code("MS-RUN-001");
                error.add_context("errors", &reason);
                Err(error)
            }
        }
    }
}

pub struct Pipeline {
    verbose: bool,
    stripper: ValueStripper,
    normalizer: Normalizer,
    scanner: SecretScanner,
    custom_rules: CustomRuleValidator,
    renderer: Arc<dyn Renderer>,
    schema: Arc<dyn SchemaValidator>,
}

impl Pipeline {
    pub fn new(
        settings: &Settings,
        renderer: Arc<dyn Renderer>,
        schema: Arc<dyn SchemaValidator>,
    ) -> Result<Self, AppError> {
        let allow_list = AllowList::new(&settings.allowed_secrets).map_err(|e| {
            AppError::new(ErrorCategory::ConfigError, e.to_string()).with_code("MS-CFG-003")
        })?;
        let custom_rules = CustomRuleValidator::new(&settings.custom_rules).map_err(|e| {
            AppError::new(ErrorCategory::ConfigError, e.to_string()).with_code("MS-CFG-004")
        })?;
        Ok(Self {
            verbose: settings.verbose,
            stripper: ValueStripper::new(settings.superfluous_keys.clone()),
            normalizer: Normalizer::new(&settings.superfluous_keys),
            scanner: SecretScanner::new(allow_list),
            custom_rules,
            renderer,
            schema,
        })
    }

    /// Render `request` and run every stage over the output.
    pub async fn run(&self, request: &RenderRequest) -> Result<PipelineOutcome, AppError> {
        let raw = self
            .renderer
            .render(request)
            .await
            .map_err(|err| fatal(PipelineState::Rendered, err))?;
        self.process(&raw).await
    }

    /// Run every stage over already rendered text.
    pub async fn process(&self, raw: &str) -> Result<PipelineOutcome, AppError> {
        let mut ledger = ErrorLedger::new();

        let mut documents = DocumentCollection::parse(raw);
        self.narrate(PipelineState::Rendered, &documents, &ledger);

        let removed = self.stripper.strip(&mut documents);
        tracing::debug!(removed, "stripped superfluous keys");
        self.narrate(PipelineState::Stripped, &documents, &ledger);

        let (documents, modified) = self.normalizer.normalize_all(documents);
        self.narrate(PipelineState::Normalized, &documents, &ledger);

        ledger.append(self.scanner.scan(&documents));
        self.narrate(PipelineState::SecretChecked, &documents, &ledger);

        let bundle =
            serialize_collection(&documents).map_err(|err| fatal(PipelineState::Serialized, err))?;
        ledger.append(bundle.errors);
        self.narrate(PipelineState::Serialized, &documents, &ledger);

        let findings = self
            .schema
            .validate(&bundle.artifact)
            .await
            .map_err(|err| fatal(PipelineState::SchemaValidated, err))?;
        ledger.append(
            findings
                .into_iter()
                .map(|message| StageError::reported(Stage::Schema, message)),
        );
        self.narrate(PipelineState::SchemaValidated, &documents, &ledger);

        let findings = self
            .custom_rules
            .validate(&bundle.artifact)
            .map_err(|err| fatal(PipelineState::CustomValidated, err))?;
        ledger.append(
            findings
                .into_iter()
                .map(|message| StageError::reported(Stage::Custom, message)),
        );
        self.narrate(PipelineState::CustomValidated, &documents, &ledger);
        self.narrate(PipelineState::Done, &documents, &ledger);

        Ok(PipelineOutcome {
            artifact: bundle.artifact,
            errors: ledger.into_vec(),
            modified,
        })
    }

    fn narrate(&self, state: PipelineState, documents: &DocumentCollection, ledger: &ErrorLedger) {
        if self.verbose {
            tracing::info!(
                stage = %state,
                documents = documents.len(),
                errors = ledger.len(),
                "stage complete"
            );
        } else {
            tracing::info!(stage = %state, "stage complete");
        }
    }
}

fn fatal(state: PipelineState, mut err: AppError) -> AppError {
    err.add_context("stage", state.as_str());
    tracing::error!(stage = %state, code = %err.code, error = %err.message, "pipeline aborted");
    err
}

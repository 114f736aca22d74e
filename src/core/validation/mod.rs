//! Validators that run over the serialized artifact.
//!
//! Both return preformatted finding strings which the pipeline records verbatim; an `Err`
//! means the validator itself could not run and aborts the pipeline.

pub mod rules;
pub mod schema;

pub use rules::{
    CompiledRule, CustomRuleValidator, ManifestRule, RuleCheck, RuleDefinition,
    RuleDefinitionError,
};
pub use schema::{KubeconformValidator, NoopSchemaValidator, SchemaValidator};

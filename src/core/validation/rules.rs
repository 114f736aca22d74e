#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::manifest::{Document, KeyPath};
use crate::core::types::ErrorCategory;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCheck {
    Present,
    Absent,
    Equals,
    Matches,
}

impl RuleCheck {
    fn needs_value(&self) -> bool {
        matches!(self, RuleCheck::Equals | RuleCheck::Matches)
    }
}

impl fmt::Display for RuleCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleCheck::Present => "present",
            RuleCheck::Absent => "absent",
            RuleCheck::Equals => "equals",
            RuleCheck::Matches => "matches",
        };
        f.write_str(name)
    }
}

/// One `[[custom_rules]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    /// Only documents of these kinds are checked; empty means every kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,
    pub path: KeyPath,
    pub check: RuleCheck,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RuleDefinitionError {
    #[error("custom rule name cannot be empty")]
    EmptyName,
    #[error("custom rule '{rule}' uses check '{check}' and needs a value")]
    MissingValue { rule: String, check: RuleCheck },
    #[error("custom rule '{rule}' has an invalid pattern: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

impl RuleDefinition {
    pub fn compile(&self) -> Result<CompiledRule, RuleDefinitionError> {
        if self.name.trim().is_empty() {
            return Err(RuleDefinitionError::EmptyName);
        }
        let expected = match (self.check, self.value.as_deref()) {
            (check, None) if check.needs_value() => {
                return Err(RuleDefinitionError::MissingValue {
                    rule: self.name.clone(),
                    check,
                })
            }
            (RuleCheck::Matches, Some(pattern)) => {
                let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
                    RuleDefinitionError::Pattern {
                        rule: self.name.clone(),
                        source,
                    }
                })?;
                Expectation::Pattern(regex)
            }
            (RuleCheck::Equals, Some(value)) => Expectation::Literal(value.to_string()),
            (RuleCheck::Absent, _) => Expectation::Absent,
            _ => Expectation::Present,
        };
        Ok(CompiledRule {
            definition: self.clone(),
            expected,
        })
    }

    fn default_message(&self) -> String {
        let value = self.value.as_deref().unwrap_or_default();
        match self.check {
            RuleCheck::Present => format!("required path '{}' is missing", self.path),
            RuleCheck::Absent => format!("forbidden path '{}' is set", self.path),
            RuleCheck::Equals => format!("path '{}' must equal '{}'", self.path, value),
            RuleCheck::Matches => format!("path '{}' must match '{}'", self.path, value),
        }
    }
}

#[derive(Debug)]
enum Expectation {
    Present,
    Absent,
    Literal(String),
    Pattern(Regex),
}

/// A document-level check.
pub trait ManifestRule: Send + Sync {
    fn name(&self) -> &str;
    /// Message for a violating document, `None` when the document passes.
    fn evaluate(&self, document: &Document) -> Option<String>;
}

/// Rule definition with its pattern compiled.
#[derive(Debug)]
pub struct CompiledRule {
    definition: RuleDefinition,
    expected: Expectation,
}

impl CompiledRule {
    fn applies_to(&self, document: &Document) -> bool {
        self.definition.kinds.is_empty()
            || document
                .kind()
                .is_some_and(|kind| self.definition.kinds.iter().any(|k| k == kind))
    }

    fn passes(&self, found: &[&Value]) -> bool {
        match &self.expected {
            Expectation::Present => !found.is_empty(),
            Expectation::Absent => found.is_empty(),
            Expectation::Literal(expected) => {
                !found.is_empty()
                    && found
                        .iter()
                        .all(|value| scalar_text(value).as_deref() == Some(expected.as_str()))
            }
            Expectation::Pattern(regex) => {
                !found.is_empty()
                    && found.iter().all(|value| {
                        scalar_text(value).is_some_and(|text| regex.is_match(&text))
                    })
            }
        }
    }
}

impl ManifestRule for CompiledRule {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn evaluate(&self, document: &Document) -> Option<String> {
        if !self.applies_to(document) {
            return None;
        }
        let mut found = Vec::new();
        collect_at(document.content(), self.definition.path.segments(), &mut found);
        if self.passes(&found) {
            return None;
        }
        Some(
            self.definition
                .message
                .clone()
                .unwrap_or_else(|| self.definition.default_message()),
        )
    }
}

fn collect_at<'a>(node: &'a Value, segments: &[String], found: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        if !node.is_null() {
            found.push(node);
        }
        return;
    };
    match node {
        Value::Mapping(map) => {
            if let Some(child) = map.get(head.as_str()) {
                collect_at(child, rest, found);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_at(item, segments, found);
            }
        }
        Value::Tagged(tagged) => collect_at(&tagged.value, segments, found),
        _ => {}
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        _ => None,
    }
}

/// Runs every configured rule over the documents of a serialized artifact.
pub struct CustomRuleValidator {
    rules: Vec<Box<dyn ManifestRule>>,
}

impl CustomRuleValidator {
    pub fn new(definitions: &[RuleDefinition]) -> Result<Self, RuleDefinitionError> {
        let mut rules: Vec<Box<dyn ManifestRule>> = Vec::with_capacity(definitions.len());
        for definition in definitions {
            rules.push(Box::new(definition.compile()?));
        }
        Ok(Self { rules })
    }

    pub fn from_rules(rules: Vec<Box<dyn ManifestRule>>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against every document, returning `<label>: [<rule>] <message>`.
    ///
    /// Commented error blocks in the artifact read as empty documents and are skipped.
    pub fn validate(&self, artifact: &str) -> Result<Vec<String>, AppError> {
        if self.rules.is_empty() {
            return Ok(Vec::new());
        }
        let documents = reread(artifact)?;
        let mut findings = Vec::new();
        for document in &documents {
            for rule in &self.rules {
                if let Some(message) = rule.evaluate(document) {
                    findings.push(format!("{}: [{}] {}", document.label(), rule.name(), message));
                }
            }
        }
        tracing::debug!(
            rules = self.rules.len(),
            documents = documents.len(),
            findings = findings.len(),
            "custom rules evaluated"
        );
        Ok(findings)
    }
}

fn reread(artifact: &str) -> Result<Vec<Document>, AppError> {
    let mut documents = Vec::new();
    for chunk in serde_yaml::Deserializer::from_str(artifact) {
        let value = Value::deserialize(chunk).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("serialized artifact could not be re-read: {}", e),
            )
            .with_code("MS-CUSTOM-001")
        })?;
        if !value.is_null() {
            documents.push(Document::new(value));
        }
    }
    Ok(documents)
}

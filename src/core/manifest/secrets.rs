use super::document::{Document, DocumentCollection, UNKNOWN_SEGMENT};
use super::stage_error::{PositionRange, Stage, StageError};
use regex::Regex;
use serde_yaml::Value;
use std::fmt;

/// Key names that mark a ConfigMap entry as a likely credential.
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "apikey",
    "api_key",
    "private_key",
    "credential",
];

/// `<namespace>/<name>/<key>` identity of one secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretIdentity {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

impl SecretIdentity {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn for_document(document: &Document, key: &str) -> Self {
        Self::new(
            document.namespace().unwrap_or(UNKNOWN_SEGMENT),
            document.name().unwrap_or(UNKNOWN_SEGMENT),
            key,
        )
    }

    /// `<namespace>/<name>`, which allows every key of one object.
    pub fn owner(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for SecretIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.name, self.key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AllowListError {
    #[error("allowed secret entry is empty")]
    Empty,
    #[error("allowed secret entry '{0}' must be '<namespace>/<name>' or '<namespace>/<name>/<key>'")]
    Shape(String),
    #[error("allowed secret entry '{entry}' cannot be compiled: {source}")]
    Pattern {
        entry: String,
        #[source]
        source: regex::Error,
    },
}

/// Compiled allowed-secret identifiers. `*` matches any run of characters.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<(String, Regex)>,
}

impl AllowList {
    pub fn new<I, S>(entries: I) -> Result<Self, AllowListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let entry = entry.as_ref().trim();
                compile_entry(entry).map(|pattern| (entry.to_string(), pattern))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(entry, _)| entry.as_str())
    }

    pub fn allows(&self, identity: &SecretIdentity) -> bool {
        let full = identity.to_string();
        let owner = identity.owner();
        self.entries
            .iter()
            .any(|(_, pattern)| pattern.is_match(&full) || pattern.is_match(&owner))
    }
}

fn compile_entry(entry: &str) -> Result<Regex, AllowListError> {
    if entry.is_empty() {
        return Err(AllowListError::Empty);
    }
    let segments = entry.split('/').count();
    if !(2..=3).contains(&segments) || entry.split('/').any(str::is_empty) {
        return Err(AllowListError::Shape(entry.to_string()));
    }
    let body: Vec<String> = entry.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", body.join(".*"))).map_err(|source| AllowListError::Pattern {
        entry: entry.to_string(),
        source,
    })
}

/// Flags secret-looking values that are not encrypted and not allowed.
///
/// Documents that already carry structural errors are skipped; they are never emitted as
/// manifests.
#[derive(Debug, Clone, Default)]
pub struct SecretScanner {
    allow_list: AllowList,
}

impl SecretScanner {
    pub fn new(allow_list: AllowList) -> Self {
        Self { allow_list }
    }

    pub fn scan(&self, documents: &DocumentCollection) -> Vec<StageError> {
        let errors: Vec<StageError> = documents
            .iter()
            .filter(|document| !document.has_errors())
            .flat_map(|document| self.scan_document(document))
            .collect();
        tracing::debug!(
            documents = documents.len(),
            violations = errors.len(),
            "secret scan finished"
        );
        errors
    }

    pub fn scan_document(&self, document: &Document) -> Vec<StageError> {
        let content = document.content();
        if content.get("sops").is_some_and(Value::is_mapping) {
            tracing::debug!(document = %document.label(), "skipping sops-encrypted document");
            return Vec::new();
        }
        let (fields, sensitive_only): (&[&str], bool) = match document.kind() {
            Some("Secret") => (&["data", "stringData"], false),
            Some("ConfigMap") => (&["data"], true),
            _ => return Vec::new(),
        };

        let label = document.label();
        let range = document.origin().map(PositionRange::point);
        let mut errors = Vec::new();
        for field in fields {
            let Some(Value::Mapping(entries)) = content.get(*field) else {
                continue;
            };
            for (key, value) in entries {
                let Some(key) = key.as_str() else {
                    continue;
                };
                if sensitive_only && !is_sensitive_key(key) {
                    continue;
                }
                if is_placeholder(value) {
                    continue;
                }
                let identity = SecretIdentity::for_document(document, key);
                if self.allow_list.allows(&identity) {
                    continue;
                }
                errors.push(StageError::for_document(
                    Stage::SecretPolicy,
                    &label,
                    range,
                    format!(
                        "unencrypted secret value for key '{}' (allow with '{}')",
                        key, identity
                    ),
                ));
            }
        }
        errors
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| key.contains(fragment))
}

/// Values that cannot be a leaked credential.
fn is_placeholder(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => {
            let text = text.trim();
            text.is_empty()
                || (text.starts_with("ENC[") && text.ends_with(']'))
                || (text.starts_with("${") && text.ends_with('}'))
                || (text.starts_with("$(") && text.ends_with(')'))
                || (text.starts_with('<') && text.ends_with('>'))
        }
        Value::Tagged(tagged) => is_placeholder(&tagged.value),
        Value::Mapping(_) | Value::Sequence(_) => true,
        _ => false,
    }
}

use super::document::{Document, DocumentCollection};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;

/// Structural path of mapping keys, e.g. `["metadata", "annotations", "config.k8s.io/id"]`.
///
/// Segments are matched literally. When a path meets a sequence the rest of the path is
/// applied to every element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct KeyPath(Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyPathError {
    #[error("key path must have at least one segment")]
    Empty,
    #[error("key path segment {0} is empty")]
    EmptySegment(usize),
}

impl KeyPath {
    pub fn new<I, S>(segments: I) -> Result<Self, KeyPathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(KeyPathError::Empty);
        }
        if let Some(index) = segments.iter().position(|s| s.is_empty()) {
            return Err(KeyPathError::EmptySegment(index));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Every proper prefix, longest first.
    pub fn parents(&self) -> impl Iterator<Item = KeyPath> + '_ {
        (1..self.0.len())
            .rev()
            .map(move |len| KeyPath(self.0[..len].to_vec()))
    }
}

impl TryFrom<Vec<String>> for KeyPath {
    type Error = KeyPathError;

    fn try_from(segments: Vec<String>) -> Result<Self, Self::Error> {
        KeyPath::new(segments)
    }
}

impl From<KeyPath> for Vec<String> {
    fn from(path: KeyPath) -> Self {
        path.0
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|segment| {
                if segment.contains('.') {
                    format!("\"{}\"", segment)
                } else {
                    segment.clone()
                }
            })
            .collect();
        f.write_str(&rendered.join("."))
    }
}

const DEFAULT_SUPERFLUOUS_KEYS: &[&[&str]] = &[
    &["status"],
    &["metadata", "creationTimestamp"],
    &["metadata", "annotations", "config.kubernetes.io/origin"],
    &["metadata", "annotations", "config.k8s.io/id"],
    &[
        "metadata",
        "annotations",
        "internal.config.kubernetes.io/annotations-migration-resource-id",
    ],
    &["metadata", "annotations", "kustomize.config.k8s.io/id"],
    &["metadata", "annotations", "kustomize.config.k8s.io/needs-hash"],
    &["metadata", "annotations", "kustomize.config.k8s.io/behavior"],
];

/// Keys the templating tool injects that carry no meaning in the final manifest.
pub fn default_superfluous_keys() -> Vec<KeyPath> {
    DEFAULT_SUPERFLUOUS_KEYS
        .iter()
        .map(|segments| KeyPath(segments.iter().map(|s| s.to_string()).collect()))
        .collect()
}

/// Removes deny-listed key paths from every document.
#[derive(Debug, Clone)]
pub struct ValueStripper {
    paths: Vec<KeyPath>,
}

impl ValueStripper {
    pub fn new(paths: Vec<KeyPath>) -> Self {
        Self { paths }
    }

    pub fn with_defaults() -> Self {
        Self::new(default_superfluous_keys())
    }

    pub fn paths(&self) -> &[KeyPath] {
        &self.paths
    }

    /// Strip every document in place. Returns the number of removed nodes.
    pub fn strip(&self, documents: &mut DocumentCollection) -> usize {
        documents
            .iter_mut()
            .map(|document| self.strip_document(document))
            .sum()
    }

    pub fn strip_document(&self, document: &mut Document) -> usize {
        let content = document.content_mut();
        self.paths
            .iter()
            .map(|path| remove_path(content, path.segments()))
            .sum()
    }
}

impl Default for ValueStripper {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn remove_path(node: &mut Value, segments: &[String]) -> usize {
    let Some((head, rest)) = segments.split_first() else {
        return 0;
    };
    match node {
        Value::Mapping(map) => {
            if rest.is_empty() {
                usize::from(map.shift_remove(head.as_str()).is_some())
            } else {
                map.get_mut(head.as_str())
                    .map(|child| remove_path(child, rest))
                    .unwrap_or(0)
            }
        }
        Value::Sequence(items) => items
            .iter_mut()
            .map(|item| remove_path(item, segments))
            .sum(),
        Value::Tagged(tagged) => remove_path(&mut tagged.value, segments),
        _ => 0,
    }
}

use super::bool_marker::marker_value;
use super::document::{Document, DocumentCollection};
use super::strip::{default_superfluous_keys, KeyPath};
use serde_yaml::{Mapping, Value};
use std::cmp::Reverse;

/// Idempotent structural cleanup applied to one document tree.
pub trait ManifestTransform: Send + Sync {
    fn name(&self) -> &'static str;
    /// Apply the cleanup in place and report whether the tree changed.
    fn apply(&self, content: &mut Value) -> bool;
}

/// Removes empty mappings and sequences left behind by stripping.
///
/// Only the parents of stripped key paths are candidates, so intentionally empty nodes such
/// as `emptyDir: {}` survive.
pub struct PruneEmptyNodes {
    parents: Vec<KeyPath>,
}

impl PruneEmptyNodes {
    pub fn for_stripped(paths: &[KeyPath]) -> Self {
        let mut parents: Vec<KeyPath> = Vec::new();
        for parent in paths.iter().flat_map(KeyPath::parents) {
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
        parents.sort_by_key(|path| Reverse(path.segments().len()));
        Self { parents }
    }
}

impl ManifestTransform for PruneEmptyNodes {
    fn name(&self) -> &'static str {
        "PruneEmptyNodes"
    }

    fn apply(&self, content: &mut Value) -> bool {
        self.parents.iter().fold(false, |changed, parent| {
            prune_at(content, parent.segments()) | changed
        })
    }
}

fn prune_at(node: &mut Value, segments: &[String]) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return false;
    };
    match node {
        Value::Mapping(map) => {
            if rest.is_empty() {
                if map.get(head.as_str()).is_some_and(is_empty_collection) {
                    map.shift_remove(head.as_str());
                    true
                } else {
                    false
                }
            } else {
                map.get_mut(head.as_str())
                    .map(|child| prune_at(child, rest))
                    .unwrap_or(false)
            }
        }
        Value::Sequence(items) => items
            .iter_mut()
            .fold(false, |changed, item| prune_at(item, segments) | changed),
        Value::Tagged(tagged) => prune_at(&mut tagged.value, segments),
        _ => false,
    }
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Mapping(map) => map.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        _ => false,
    }
}

/// Turns scalars that are exactly a boolean marker into real booleans.
pub struct CollapseBooleanMarkers;

impl ManifestTransform for CollapseBooleanMarkers {
    fn name(&self) -> &'static str {
        "CollapseBooleanMarkers"
    }

    fn apply(&self, content: &mut Value) -> bool {
        collapse_markers(content)
    }
}

fn collapse_markers(node: &mut Value) -> bool {
    if let Some(flag) = node.as_str().and_then(marker_value) {
        *node = Value::Bool(flag);
        return true;
    }
    match node {
        Value::Mapping(map) => map
            .values_mut()
            .fold(false, |changed, value| collapse_markers(value) | changed),
        Value::Sequence(items) => items
            .iter_mut()
            .fold(false, |changed, item| collapse_markers(item) | changed),
        Value::Tagged(tagged) => collapse_markers(&mut tagged.value),
        _ => false,
    }
}

const TOP_LEVEL_ORDER: &[&str] = &["apiVersion", "kind", "metadata"];
const METADATA_ORDER: &[&str] = &["name", "namespace", "labels", "annotations"];
const SORTED_METADATA_MAPS: &[&str] = &["labels", "annotations"];

/// Deterministic key order for the identifying part of a manifest.
pub struct CanonicalKeyOrder;

impl ManifestTransform for CanonicalKeyOrder {
    fn name(&self) -> &'static str {
        "CanonicalKeyOrder"
    }

    fn apply(&self, content: &mut Value) -> bool {
        let Value::Mapping(root) = content else {
            return false;
        };
        let mut changed = reorder(root, TOP_LEVEL_ORDER);
        if let Some(Value::Mapping(metadata)) = root.get_mut("metadata") {
            changed |= reorder(metadata, METADATA_ORDER);
            for key in SORTED_METADATA_MAPS {
                if let Some(Value::Mapping(entries)) = metadata.get_mut(*key) {
                    changed |= sort_entries(entries);
                }
            }
        }
        changed
    }
}

/// Move `leading` keys to the front, keep the rest in their current order.
fn reorder(map: &mut Mapping, leading: &[&str]) -> bool {
    let before: Vec<Value> = map.keys().cloned().collect();
    let mut ordered = Mapping::with_capacity(map.len());
    for key in leading {
        if let Some((k, v)) = map.shift_remove_entry(*key) {
            ordered.insert(k, v);
        }
    }
    for (k, v) in std::mem::take(map) {
        ordered.insert(k, v);
    }
    let changed = !ordered.keys().eq(before.iter());
    *map = ordered;
    changed
}

fn sort_entries(map: &mut Mapping) -> bool {
    let mut entries: Vec<(Value, Value)> = std::mem::take(map).into_iter().collect();
    let sorted = entries
        .windows(2)
        .all(|pair| key_text(&pair[0].0) <= key_text(&pair[1].0));
    if !sorted {
        entries.sort_by_key(|(key, _)| key_text(key));
    }
    *map = entries.into_iter().collect();
    !sorted
}

fn key_text(key: &Value) -> String {
    match key.as_str() {
        Some(text) => text.to_string(),
        None => serde_yaml::to_string(key).unwrap_or_default(),
    }
}

/// Ordered set of cleanups applied to every document.
pub struct Normalizer {
    transforms: Vec<Box<dyn ManifestTransform>>,
}

impl Normalizer {
    /// Built-in cleanups, pruning the parents of `stripped_paths`.
    pub fn new(stripped_paths: &[KeyPath]) -> Self {
        let transforms: Vec<Box<dyn ManifestTransform>> = vec![
            Box::new(PruneEmptyNodes::for_stripped(stripped_paths)),
            Box::new(CollapseBooleanMarkers),
            Box::new(CanonicalKeyOrder),
        ];
        Self { transforms }
    }

    pub fn with_transforms(transforms: Vec<Box<dyn ManifestTransform>>) -> Self {
        Self { transforms }
    }

    pub fn transform_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Clean one document, returning it with a flag telling whether anything changed.
    pub fn normalize(&self, mut document: Document) -> (Document, bool) {
        let mut modified = false;
        for transform in &self.transforms {
            if transform.apply(document.content_mut()) {
                tracing::trace!(
                    transform = transform.name(),
                    document = %document.label(),
                    "normalized"
                );
                modified = true;
            }
        }
        (document, modified)
    }

    pub fn normalize_all(&self, documents: DocumentCollection) -> (DocumentCollection, bool) {
        let mut normalized = DocumentCollection::new();
        let mut modified = false;
        for document in documents {
            let (document, changed) = self.normalize(document);
            normalized.push(document);
            modified |= changed;
        }
        if !modified {
            tracing::debug!("no normalization changes");
        }
        (normalized, modified)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&default_superfluous_keys())
    }
}

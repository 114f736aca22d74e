//! Manifest document model and the in-place pipeline stages.
//!
//! ## Files
//! - `document.rs`: parsed documents, the ordered collection and structural checks.
//! - `stage_error.rs`: accumulated findings and the append-only ledger.
//! - `strip.rs`: deny-listed key removal.
//! - `normalize.rs`: idempotent structural cleanups.
//! - `bool_marker.rs`: exact-token recognition of the boolean markers.
//! - `secrets.rs`: unencrypted secret heuristics and the allow-list.
//! - `serialize.rs`: artifact text assembly.

pub mod bool_marker;
pub mod document;
pub mod normalize;
pub mod secrets;
pub mod serialize;
pub mod stage_error;
pub mod strip;

pub use document::{Document, DocumentCollection, UNKNOWN_SEGMENT};
pub use normalize::{ManifestTransform, Normalizer};
pub use secrets::{AllowList, AllowListError, SecretIdentity, SecretScanner};
pub use serialize::{serialize_collection, SerializedBundle, DOCUMENT_SEPARATOR};
pub use stage_error::{ErrorLedger, ErrorOrigin, Position, PositionRange, Stage, StageError};
pub use strip::{default_superfluous_keys, KeyPath, KeyPathError, ValueStripper};

use super::document::{Document, DocumentCollection};
use super::stage_error::StageError;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

pub const DOCUMENT_SEPARATOR: &str = "---";

/// Serialized artifact plus the structural errors of the documents that were commented out.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedBundle {
    pub artifact: String,
    pub errors: Vec<StageError>,
}

/// Join every document into one `---` separated artifact.
///
/// A document with structural errors is written as a comment block, so the artifact still
/// parses as YAML.
pub fn serialize_collection(documents: &DocumentCollection) -> Result<SerializedBundle, AppError> {
    let mut blocks = Vec::with_capacity(documents.len());
    let mut errors = Vec::new();

    for document in documents {
        if document.has_errors() {
            blocks.push(error_block(document)?);
            errors.extend(document.errors().iter().cloned());
        } else {
            blocks.push(document_text(document)?);
        }
    }

    Ok(SerializedBundle {
        artifact: blocks.join(&format!("{}\n", DOCUMENT_SEPARATOR)),
        errors,
    })
}

fn document_text(document: &Document) -> Result<String, AppError> {
    serde_yaml::to_string(document.content()).map_err(|e| {
        AppError::new(
            ErrorCategory::SerializationError,
            format!("failed to serialize document {}: {}", document.label(), e),
        )
        .with_code("MS-SER-001")
    })
}

fn error_block(document: &Document) -> Result<String, AppError> {
    let messages: Vec<String> = document.errors().iter().map(ToString::to_string).collect();
    let listing = serde_yaml::to_string(&messages).map_err(|e| {
        AppError::new(
            ErrorCategory::SerializationError,
            format!("failed to serialize error listing for {}: {}", document.label(), e),
        )
        .with_code("MS-SER-002")
    })?;

    let header = format!("Document {} has errors:", escape_breaks(&document.label()));
    let body = listing.trim_end_matches(is_line_break).split(is_line_break);
    let mut block = String::new();
    for line in std::iter::once(header.as_str()).chain(body) {
        block.push_str("# ");
        block.push_str(line);
        block.push('\n');
    }
    Ok(block)
}

/// Every character a YAML parser treats as ending a line, including NEL, LS and PS.
fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// Keeps a label on one comment line whatever its fields contain.
fn escape_breaks(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if is_line_break(c) || c.is_control() {
                c.escape_default().to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}

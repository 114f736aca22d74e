use super::stage_error::{Position, PositionRange, Stage, StageError};
use serde_yaml::Value;

/// Placeholder used for any label segment that is absent.
pub const UNKNOWN_SEGMENT: &str = "<unknown>";

/// One parsed manifest document.
///
/// The content tree is mutated in place by the strip and normalize stages; the
/// structural error list is only ever appended to while the document is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    content: Value,
    errors: Vec<StageError>,
    origin: Option<Position>,
}

impl Document {
    /// Wrap an already parsed tree and run the structural checks on it.
    pub fn new(content: Value) -> Self {
        let mut document = Self {
            content,
            errors: Vec::new(),
            origin: None,
        };
        document.check_structure();
        document
    }

    /// Parse one document chunk whose first line sits at `first_line` of the rendered text.
    /// `marker_width` is the length of a `--- ` prefix removed from that first line.
    ///
    /// Returns `None` for chunks that hold nothing but comments, whitespace or a null.
    pub fn parse(chunk: &str, first_line: usize, marker_width: usize) -> Option<Self> {
        if is_blank(chunk) {
            return None;
        }
        let origin = Position::new(first_line, 1);
        match serde_yaml::from_str::<Value>(chunk) {
            Ok(Value::Null) => None,
            Ok(content) => {
                let mut document = Self {
                    content,
                    errors: Vec::new(),
                    origin: Some(origin),
                };
                document.check_structure();
                Some(document)
            }
            Err(err) => {
                let range = err.location().map(|location| {
                    let column = if location.line() == 1 {
                        location.column() + marker_width
                    } else {
                        location.column()
                    };
                    PositionRange::point(Position::new(
                        first_line + location.line().saturating_sub(1),
                        column,
                    ))
                });
                let mut document = Self {
                    content: Value::Null,
                    errors: Vec::new(),
                    origin: Some(origin),
                };
                let label = document.label();
                document.errors.push(StageError::for_document(
                    Stage::Structural,
                    label,
                    range.or(Some(PositionRange::point(origin))),
                    parser_message(&err),
                ));
                Some(document)
            }
        }
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Value {
        &mut self.content
    }

    pub fn into_content(self) -> Value {
        self.content
    }

    pub fn errors(&self) -> &[StageError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Position of the first line of this document in the rendered text, when known.
    pub fn origin(&self) -> Option<Position> {
        self.origin
    }

    pub fn kind(&self) -> Option<&str> {
        non_empty(self.content.get("kind").and_then(Value::as_str))
    }

    pub fn api_version(&self) -> Option<&str> {
        non_empty(self.content.get("apiVersion").and_then(Value::as_str))
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    /// `<kind>/<namespace>/<name>`, with `<unknown>` for any absent segment.
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}",
            self.kind().unwrap_or(UNKNOWN_SEGMENT),
            self.namespace().unwrap_or(UNKNOWN_SEGMENT),
            self.name().unwrap_or(UNKNOWN_SEGMENT)
        )
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        non_empty(
            self.content
                .get("metadata")
                .and_then(|metadata| metadata.get(key))
                .and_then(Value::as_str),
        )
    }

    fn check_structure(&mut self) {
        let range = self.origin.map(PositionRange::point);
        let mut problems = Vec::new();
        if !self.content.is_mapping() {
            problems.push("document root must be a mapping".to_string());
        } else {
            if self.api_version().is_none() {
                problems.push("missing required field 'apiVersion'".to_string());
            }
            if self.kind().is_none() {
                problems.push("missing required field 'kind'".to_string());
            }
            if self.name().is_none() {
                problems.push("missing required field 'metadata.name'".to_string());
            }
        }
        let label = self.label();
        self.errors.extend(
            problems
                .into_iter()
                .map(|message| StageError::for_document(Stage::Structural, &label, range, message)),
        );
    }
}

/// Ordered documents of one run, in the order the templating tool emitted them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentCollection {
    documents: Vec<Document>,
}

impl DocumentCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split multi-document text and parse every document independently.
    pub fn parse(raw: &str) -> Self {
        let documents = split_documents(raw)
            .into_iter()
            .filter_map(|chunk| {
                Document::parse(&chunk.text, chunk.first_line, chunk.marker_width)
            })
            .collect();
        Self { documents }
    }

    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn push(&mut self, document: Document) {
        self.documents.push(document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Document> {
        self.documents.iter_mut()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Number of structural errors carried by all documents.
    pub fn structural_error_count(&self) -> usize {
        self.documents.iter().map(|d| d.errors().len()).sum()
    }
}

impl IntoIterator for DocumentCollection {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentCollection {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

impl FromIterator<Document> for DocumentCollection {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self {
            documents: iter.into_iter().collect(),
        }
    }
}

struct Chunk {
    first_line: usize,
    marker_width: usize,
    text: String,
}

/// Split on `---` document markers and `...` end markers, keeping where every chunk starts
/// so parser positions can be mapped back onto the whole text.
fn split_documents(raw: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = Chunk {
        first_line: 1,
        marker_width: 0,
        text: String::new(),
    };

    for (index, line) in raw.lines().enumerate() {
        let line_number = index + 1;
        if let Some(rest) = document_marker(line) {
            let next = Chunk {
                first_line: line_number,
                marker_width: line.len() - rest.len(),
                text: format!("{}\n", rest),
            };
            chunks.push(std::mem::replace(&mut current, next));
        } else if line == "..." {
            let next = Chunk {
                first_line: line_number + 1,
                marker_width: 0,
                text: String::new(),
            };
            chunks.push(std::mem::replace(&mut current, next));
        } else {
            current.text.push_str(line);
            current.text.push('\n');
        }
    }
    chunks.push(current);
    chunks
}

fn document_marker(line: &str) -> Option<&str> {
    if line == "---" {
        return Some("");
    }
    line.strip_prefix("--- ")
        .or_else(|| line.strip_prefix("---\t"))
}

fn is_blank(chunk: &str) -> bool {
    chunk.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with('#')
    })
}

fn parser_message(err: &serde_yaml::Error) -> String {
    let text = err.to_string();
    match text.split_once(" at line ") {
        Some((message, _)) => message.to_string(),
        None => text,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

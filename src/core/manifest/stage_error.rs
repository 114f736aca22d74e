use serde::Serialize;
use std::fmt;

/// Label used for findings that belong to a whole stage rather than one document.
pub const GLOBAL_LABEL: &str = "<global>";

/// Stage that produced an accumulated finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Structural,
    SecretPolicy,
    Schema,
    Custom,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Structural => "structural",
            Stage::SecretPolicy => "secret-policy",
            Stage::Schema => "schema",
            Stage::Custom => "custom",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-based line/column inside the rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionRange {
    pub start: Position,
    pub end: Position,
}

impl PositionRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at a single position.
    pub fn point(position: Position) -> Self {
        Self::new(position, position)
    }
}

/// Where a finding is attributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ErrorOrigin {
    Document {
        label: String,
        range: Option<PositionRange>,
    },
    /// Message already formatted with document context by an external validator.
    Reported,
}

/// One accumulated, non-fatal finding.
///
/// Fields are private so a finding cannot change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageError {
    stage: Stage,
    origin: ErrorOrigin,
    message: String,
}

impl StageError {
    pub fn for_document(
        stage: Stage,
        label: impl Into<String>,
        range: Option<PositionRange>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            origin: ErrorOrigin::Document {
                label: label.into(),
                range,
            },
            message: message.into(),
        }
    }

    /// Finding attributed to a whole stage, labelled `<global>`.
    pub fn global(stage: Stage, message: impl Into<String>) -> Self {
        Self::for_document(stage, GLOBAL_LABEL, None, message)
    }

    /// Finding whose text is kept verbatim.
    pub fn reported(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            origin: ErrorOrigin::Reported,
            message: message.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn origin(&self) -> &ErrorOrigin {
        &self.origin
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn label(&self) -> Option<&str> {
        match &self.origin {
            ErrorOrigin::Document { label, .. } => Some(label),
            ErrorOrigin::Reported => None,
        }
    }

    pub fn range(&self) -> Option<PositionRange> {
        match &self.origin {
            ErrorOrigin::Document { range, .. } => *range,
            ErrorOrigin::Reported => None,
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            ErrorOrigin::Document {
                label,
                range: Some(range),
            } => write!(f, "{} {} {}: {}", label, range.start, range.end, self.message),
            ErrorOrigin::Document { label, range: None } => {
                write!(f, "{}: {}", label, self.message)
            }
            ErrorOrigin::Reported => f.write_str(&self.message),
        }
    }
}

/// Append-only list of findings for one run.
///
/// Entries cannot be removed or edited once appended.
#[derive(Debug, Default)]
pub struct ErrorLedger {
    entries: Vec<StageError>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, errors: impl IntoIterator<Item = StageError>) {
        self.entries.extend(errors);
    }

    pub fn push(&mut self, error: StageError) {
        self.entries.push(error);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[StageError] {
        &self.entries
    }

    pub fn count_for(&self, stage: Stage) -> usize {
        self.entries.iter().filter(|e| e.stage() == stage).count()
    }

    pub fn into_vec(self) -> Vec<StageError> {
        self.entries
    }
}

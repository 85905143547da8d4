use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    pub fn synthetic() -> Self {
        Self {
            start: SourceLocation { line: 1, column: 1 },
            end: SourceLocation { line: 1, column: 1 },
        }
    }

    pub fn contains_line(&self, line: usize) -> bool {
        self.start.line <= line && line <= self.end.line
    }
}

/// One validation finding. Ordering inside a result list follows file
/// traversal order, never severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: usize,
    /// Tag name of the offending node.
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<PathBuf>,
        line: usize,
        kind: impl Into<String>,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            kind: kind.into(),
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.line, self.message)
    }
}

/// A jump target for go-to-definition consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocation {
    pub path: PathBuf,
    pub line: usize,
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn span_contains_line_is_inclusive() {
        let span = SourceSpan {
            start: SourceLocation { line: 3, column: 1 },
            end: SourceLocation { line: 5, column: 9 },
        };
        assert!(span.contains_line(3));
        assert!(span.contains_line(5));
        assert!(!span.contains_line(6));
        assert!(SourceSpan::synthetic().contains_line(1));
    }

    #[test]
    fn diagnostic_serializes_kind_as_type() {
        let item = Diagnostic::new("/skin/1080i/Home.xml", 4, "label", "Hello", "x");
        let json = serde_json::to_value(&item).expect("diagnostic should serialize");
        assert_eq!(json["type"], "label");
        assert_eq!(item.file_name(), "Home.xml");
        assert_eq!(item.to_string(), "/skin/1080i/Home.xml:4: x");
    }
}

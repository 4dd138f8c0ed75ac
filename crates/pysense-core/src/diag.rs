//! Structured diagnostics attached to source locations.
//!
//! Semantic analysis reports problems as data, never as control flow: an
//! unresolved import or a suspicious method signature produces a
//! [`Diagnostic`] on the file being built and the build carries on.

use crate::source::{FileId, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is.
///
/// `Hint` marks best-effort observations the user may want to ignore;
/// `Warning` marks likely mistakes; `Error` marks constructs that are
/// semantically invalid even though they parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// A structured problem record: location, severity, message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: FileId,
    pub span: Span,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: FileId, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            file,
            span,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(file: FileId, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            file,
            span,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn hint(file: FileId, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            file,
            span,
            severity: Severity::Hint,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {} {}",
            self.severity, self.message, self.file, self.span
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_serialization() {
        let d = Diagnostic::warning(FileId(1), Span::new(4, 10), "module \"foo\" not found");
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"warning\""));
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::hint(FileId(0), Span::new(0, 1), "assignment to call returning nothing");
        let text = d.to_string();
        assert!(text.starts_with("hint:"));
        assert!(text.contains("file_0"));
    }
}

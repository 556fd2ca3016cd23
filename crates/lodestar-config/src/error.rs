//! Configuration error types.
//!
//! Three families are kept apart:
//! - [`ReadFailure`] - the document could not be acquired or parsed
//! - [`ValidationError`] - the document violates the schema
//! - [`AccessError`] - application code asked for the wrong type after load

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ValueKind;

/// Errors raised while acquiring and parsing a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadFailure {
    /// Configuration file not found.
    #[error("configuration file not found: {}", .path.display())]
    PathNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The process may not read the file.
    #[error("permission denied reading configuration file: {}", .path.display())]
    PermissionDenied {
        /// Path to the file.
        path: PathBuf,
    },

    /// The document is not syntactically valid.
    #[error("malformed configuration at line {line}, column {column}: {detail}")]
    MalformedSyntax {
        /// 1-based line of the fault.
        line: usize,
        /// 1-based column of the fault.
        column: usize,
        /// Parser diagnostic.
        detail: String,
    },

    /// The document is empty or whitespace only.
    #[error("configuration document is empty")]
    EmptyInput,

    /// Any other I/O fault (e.g. the path is a directory).
    #[error("failed to read configuration file {}: {reason}", .path.display())]
    Unreadable {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error text.
        reason: String,
    },
}

impl ReadFailure {
    /// Maps an I/O error raised while reading `path`.
    pub fn from_io(path: impl AsRef<Path>, err: &io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => Self::PathNotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Unreadable {
                path,
                reason: err.to_string(),
            },
        }
    }

    /// Create a new syntax error.
    pub fn malformed(line: usize, column: usize, detail: impl Into<String>) -> Self {
        Self::MalformedSyntax {
            line,
            column,
            detail: detail.into(),
        }
    }
}

/// Which kind of schema rule was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// A required field is absent and the rule has no default.
    MissingRequiredField,
    /// The field is present but holds the wrong kind of value.
    TypeMismatch,
    /// Two rules cover the same path with different expected kinds.
    DuplicateRuleConflict,
}

impl Violation {
    /// Short name used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingRequiredField => "missing_required_field",
            Self::TypeMismatch => "type_mismatch",
            Self::DuplicateRuleConflict => "duplicate_rule_conflict",
        }
    }
}

/// One violated schema rule.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// Dot-delimited field path.
    pub path: String,
    /// What went wrong.
    pub violation: Violation,
    /// The kind the rule expects.
    pub expected: ValueKind,
    /// The kind found in the document, `None` when the field is missing.
    pub actual: Option<ValueKind>,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Create a missing-field error.
    pub fn missing(path: impl Into<String>, expected: ValueKind) -> Self {
        let path = path.into();
        Self {
            message: format!("missing required field (expected {expected})"),
            path,
            violation: Violation::MissingRequiredField,
            expected,
            actual: None,
        }
    }

    /// Create a type-mismatch error.
    pub fn mismatch(path: impl Into<String>, expected: ValueKind, actual: ValueKind) -> Self {
        Self {
            path: path.into(),
            violation: Violation::TypeMismatch,
            expected,
            actual: Some(actual),
            message: format!("expected {expected}, got {actual}"),
        }
    }

    /// Create a duplicate-rule error.
    pub fn duplicate_rule(path: impl Into<String>, first: ValueKind, second: ValueKind) -> Self {
        Self {
            path: path.into(),
            violation: Violation::DuplicateRuleConflict,
            expected: second,
            actual: None,
            message: format!("declared by conflicting rules (expected {first} and {second})"),
        }
    }

    /// Replaces the message, keeping the structured fields.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The `actual` kind as text, `"missing"` when absent.
    #[must_use]
    pub fn actual_name(&self) -> &'static str {
        self.actual.map_or("missing", ValueKind::as_str)
    }
}

/// Raised by typed accessors when the stored value has a different kind.
///
/// Presence rules are settled at load time, so this always points at a
/// mismatch between the embedding application and its own schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The accessor type disagrees with the stored value.
    #[error("configuration field {path} is {actual}, requested as {requested}")]
    TypeMismatch {
        /// Dot-delimited field path.
        path: String,
        /// The accessor's type.
        requested: ValueKind,
        /// The stored kind.
        actual: ValueKind,
    },
}

/// Why a load attempt did not produce a configuration.
///
/// This is both the error half of [`LoadOutcome::into_result`](crate::LoadOutcome::into_result)
/// and the payload of the `LoadFailed` event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadFailure {
    /// The document could not be read or parsed.
    #[error(transparent)]
    Read(#[from] ReadFailure),

    /// The document violates the schema.
    #[error("configuration validation failed: {}", ErrorList(.0))]
    Validation(Vec<ValidationError>),
}

struct ErrorList<'a>(&'a [ValidationError]);

impl fmt::Display for ErrorList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_not_found_error() {
        let err = ReadFailure::from_io(
            "/path/to/config.json",
            &io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(err, ReadFailure::PathNotFound { .. }));
        assert!(err.to_string().contains("/path/to/config.json"));
    }

    #[test]
    fn test_permission_denied_error() {
        let err = ReadFailure::from_io("/etc/app.json", &io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(
            err,
            ReadFailure::PermissionDenied {
                path: PathBuf::from("/etc/app.json")
            }
        );
    }

    #[test]
    fn test_other_io_error_is_unreadable() {
        let err = ReadFailure::from_io("/etc", &io::Error::new(io::ErrorKind::Other, "is a directory"));
        match err {
            ReadFailure::Unreadable { reason, .. } => assert!(reason.contains("is a directory")),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_error_display() {
        let err = ReadFailure::malformed(3, 7, "expected value");
        let text = err.to_string();
        assert!(text.contains("line 3"));
        assert!(text.contains("column 7"));
        assert!(text.contains("expected value"));
    }

    #[test]
    fn test_mismatch_error_fields() {
        let err = ValidationError::mismatch("server.port", ValueKind::Integer, ValueKind::String);
        assert_eq!(err.violation, Violation::TypeMismatch);
        assert_eq!(err.actual_name(), "string");
        assert_eq!(err.to_string(), "server.port: expected integer, got string");
    }

    #[test]
    fn test_missing_error_reports_missing() {
        let err = ValidationError::missing("server.host", ValueKind::String);
        assert_eq!(err.actual, None);
        assert_eq!(err.actual_name(), "missing");
        assert!(err.message.contains("string"));
    }

    #[test]
    fn test_load_failure_lists_every_error() {
        let failure = LoadFailure::Validation(vec![
            ValidationError::missing("a", ValueKind::String),
            ValidationError::mismatch("b", ValueKind::Boolean, ValueKind::Integer),
        ]);
        let text = failure.to_string();
        assert!(text.contains("a: missing"));
        assert!(text.contains("b: expected boolean, got integer"));
    }

    #[test]
    fn test_access_error_display() {
        let err = AccessError::TypeMismatch {
            path: "server.port".to_string(),
            requested: ValueKind::String,
            actual: ValueKind::Integer,
        };
        assert_eq!(
            err.to_string(),
            "configuration field server.port is integer, requested as string"
        );
    }
}

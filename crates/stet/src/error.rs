//! Engine errors.
//!
//! Two categories exist. [`ValidationError`]s are recoverable findings
//! accumulated while unmarshalling (type mismatches, unknown keys, absent
//! required fields); the model is still constructed and the errors are
//! returned alongside it in a [`ValidationErrors`] list. [`Error`]s are
//! fatal: syntax errors, unresolved anchors, cancellation, I/O. A fatal
//! error aborts the operation.

use std::{fmt, io};

/// What a validation finding is about.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ValidationErrorKind {
    /// A node of the wrong kind or tag for the declared field type.
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },
    /// A mapping key that matches no declared field and is not an extension.
    UnknownKey(String),
    /// A required field absent from the source (or unset after sync).
    RequiredFieldMissing(String),
    /// A scalar that does not parse into the declared value set
    /// (e.g. an enumerated newtype).
    InvalidValue {
        expected: &'static str,
        actual: String,
    },
}

/// A recoverable finding produced while unmarshalling a document.
#[derive(Debug, Clone)]
pub struct ValidationError {
    kind: ValidationErrorKind,
    path: String,
    line: u32,
    column: u32,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, path: String, line: u32, column: u32) -> Self {
        Self {
            kind,
            path,
            line,
            column,
        }
    }

    /// Returns what this finding is about.
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    /// Dot-separated path of the offending value, e.g. `steps.0.operationId`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 1-based source line of the offending node (0 when unknown).
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based source column of the offending node (0 when unknown).
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.path.is_empty() {
            String::new()
        } else {
            format!(" at `{}`", self.path)
        };
        let pos = if self.line == 0 {
            String::new()
        } else {
            format!(" [{}:{}]", self.line, self.column)
        };
        match &self.kind {
            ValidationErrorKind::TypeMismatch { expected, actual } => {
                write!(
                    formatter,
                    "type mismatch{at}{pos}: expected {expected}, found {actual}"
                )
            }
            ValidationErrorKind::UnknownKey(key) => {
                write!(formatter, "unknown key `{key}`{at}{pos}")
            }
            ValidationErrorKind::RequiredFieldMissing(key) => {
                write!(formatter, "missing required field `{key}`{at}")
            }
            ValidationErrorKind::InvalidValue { expected, actual } => {
                write!(
                    formatter,
                    "invalid value{at}{pos}: expected {expected}, found `{actual}`"
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Accumulated [`ValidationError`]s from one unmarshal or sync pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub(crate) fn push(&mut self, err: ValidationError) {
        self.errors.push(err);
    }

    pub(crate) fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> + '_ {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first(&self) -> Option<&ValidationError> {
        self.errors.first()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for err in &self.errors {
            writeln!(formatter, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Fatal engine error.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input is not parseable as the supported YAML/JSON subset.
    Syntax {
        line: u32,
        column: u32,
        message: String,
    },
    /// An alias referenced an anchor that was never declared.
    UnknownAnchor {
        name: String,
        line: u32,
        column: u32,
    },
    /// An alias was used as a mapping key; alias keys are rejected
    /// (alias values are allowed everywhere).
    AliasKey { line: u32, column: u32 },
    /// The ambient [`CancelToken`](crate::CancelToken) was triggered.
    Canceled,
    /// Error writing marshalled output.
    Io(io::Error),
}

impl Error {
    pub(crate) fn syntax(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax {
                line,
                column,
                message,
            } => write!(formatter, "syntax error at {line}:{column}: {message}"),
            Self::UnknownAnchor { name, line, column } => {
                write!(formatter, "unknown anchor `&{name}` at {line}:{column}")
            }
            Self::AliasKey { line, column } => write!(
                formatter,
                "alias used as mapping key at {line}:{column}; alias keys are not supported"
            ),
            Self::Canceled => formatter.write_str("operation canceled"),
            Self::Io(err) => write!(formatter, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

//! Runtime error types.

use crate::limits::LimitError;
use crate::token::Position;
use policy::Capability;
use thiserror::Error;

/// Stable classification of a failed evaluation.
///
/// The tag returned by [`ErrorKind::tag`] prefixes every error text that
/// leaves the engine, so embedders can branch without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Runtime,
    PermissionDenied,
}

impl ErrorKind {
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "ParseError",
            ErrorKind::Runtime => "RuntimeError",
            ErrorKind::PermissionDenied => "PermissionDenied",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Malformed source. Nothing was executed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: Position },

    #[error("unterminated string starting at {pos}")]
    UnterminatedString { pos: Position },

    #[error("unterminated block comment starting at {pos}")]
    UnterminatedComment { pos: Position },

    #[error("invalid escape sequence '\\{ch}' at {pos}")]
    InvalidEscape { ch: char, pos: Position },

    #[error("invalid number '{text}' at {pos}")]
    InvalidNumber { text: String, pos: Position },

    #[error("expected {expected}, found {found} at {pos}")]
    UnexpectedToken {
        expected: String,
        found: String,
        pos: Position,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("invalid assignment target at {pos}")]
    InvalidAssignment { pos: Position },

    #[error("nesting deeper than {limit} levels at {pos}")]
    TooDeep { limit: usize, pos: Position },

    #[error("source text is not valid UTF-8")]
    InvalidUtf8,
}

/// Failure while executing a well-formed program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("value of type {0} is not callable")]
    NotCallable(&'static str),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{op} failed: {detail}")]
    Io { op: &'static str, detail: String },

    #[error(transparent)]
    Limit(#[from] LimitError),

    #[error("{0} outside of a loop")]
    StrayControl(&'static str),

    #[error("import failed: {0}")]
    Import(String),

    #[error("thrown: {0}")]
    Thrown(String),
}

impl RuntimeError {
    pub(crate) fn type_mismatch(expected: &str, got: &str) -> Self {
        RuntimeError::Type(format!("expected {expected}, got {got}"))
    }

    pub(crate) fn io(op: &'static str, err: impl std::fmt::Display) -> Self {
        RuntimeError::Io {
            op,
            detail: err.to_string(),
        }
    }
}

/// Every way an evaluation can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// A privileged primitive ran without the capability it needs.
    #[error("{primitive} requires capability {capability}{}", scope_suffix(.scope))]
    PermissionDenied {
        capability: Capability,
        primitive: String,
        scope: Option<String>,
    },
}

fn scope_suffix(scope: &Option<String>) -> String {
    scope
        .as_ref()
        .map(|s| format!(" (scope: {s})"))
        .unwrap_or_default()
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) => ErrorKind::Parse,
            Error::Runtime(_) => ErrorKind::Runtime,
            Error::PermissionDenied { .. } => ErrorKind::PermissionDenied,
        }
    }

    /// The capability whose absence caused this error, if any.
    pub fn missing_capability(&self) -> Option<Capability> {
        match self {
            Error::PermissionDenied { capability, .. } => Some(*capability),
            _ => None,
        }
    }

    /// Error text with its stable kind tag, e.g. `"RuntimeError: division by zero"`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.kind().tag(), self)
    }
}

impl From<LimitError> for Error {
    fn from(err: LimitError) -> Self {
        Error::Runtime(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prefixes_kind_tag() {
        let err = Error::from(RuntimeError::DivisionByZero);
        assert_eq!(err.render(), "RuntimeError: division by zero");

        let err = Error::from(ParseError::UnexpectedEof {
            expected: "')'".into(),
        });
        assert_eq!(
            err.render(),
            "ParseError: unexpected end of input, expected ')'"
        );
    }

    #[test]
    fn permission_denied_names_capability() {
        let err = Error::PermissionDenied {
            capability: Capability::FileWrite,
            primitive: "WRITE_FILE".into(),
            scope: Some("out.txt".into()),
        };
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(err.missing_capability(), Some(Capability::FileWrite));
        assert_eq!(
            err.render(),
            "PermissionDenied: WRITE_FILE requires capability FileWrite (scope: out.txt)"
        );
    }
}

//! Text-only view of an evaluation result.

use crate::error::{ErrorKind, Result};
use crate::value::Value;

/// The result of an evaluation reduced to what crosses a text boundary:
/// either the rendered value or an error kind with its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    Success(String),
    Failure { kind: ErrorKind, message: String },
}

impl EvalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EvalOutcome::Success(_))
    }

    /// Rendered value, or `"<Kind>: <message>"` for failures.
    pub fn text(&self) -> String {
        match self {
            EvalOutcome::Success(text) => text.clone(),
            EvalOutcome::Failure { kind, message } => format!("{}: {message}", kind.tag()),
        }
    }
}

impl From<Result<Value>> for EvalOutcome {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(value) => EvalOutcome::Success(value.to_string()),
            Err(err) => EvalOutcome::Failure {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }
}

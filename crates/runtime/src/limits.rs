//! Deterministic execution budgets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling on nested expression evaluation, whatever [`Limits`] says.
///
/// Every function call passes through at least one level, so this also
/// bounds recursion when `max_call_depth` is `None`.
pub const MAX_EVAL_DEPTH: usize = 2048;

/// Deepest allowed nesting of arrays, dictionaries and closures.
pub const MAX_VALUE_DEPTH: usize = 128;

/// Resource limits applied to every evaluation on an engine.
///
/// These are counted in interpreter steps and call frames, never in wall
/// time: a host that needs a deadline has to enforce it from outside.
/// Nesting is capped separately by [`MAX_EVAL_DEPTH`] and
/// [`MAX_VALUE_DEPTH`], so even [`Limits::unlimited`] cannot exhaust the
/// native stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum statements, loop iterations and calls per evaluation.
    pub max_steps: Option<u64>,

    /// Maximum nested function calls.
    pub max_call_depth: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_call_depth: Some(100),
        }
    }
}

impl Limits {
    pub fn unlimited() -> Self {
        Self {
            max_steps: None,
            max_call_depth: None,
        }
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = Some(depth);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitError {
    #[error("step limit exceeded ({limit} steps)")]
    Steps { limit: u64 },

    #[error("call depth limit exceeded ({limit} frames)")]
    CallDepth { limit: usize },

    #[error("evaluation nested deeper than {limit} levels")]
    EvalDepth { limit: usize },

    #[error("value nesting exceeds {limit} levels")]
    ValueDepth { limit: usize },
}

/// Reject a value that would be nested deeper than [`MAX_VALUE_DEPTH`].
pub(crate) fn check_value_depth(depth: usize) -> Result<(), LimitError> {
    if depth > MAX_VALUE_DEPTH {
        return Err(LimitError::ValueDepth {
            limit: MAX_VALUE_DEPTH,
        });
    }
    Ok(())
}

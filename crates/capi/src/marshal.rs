//! Flattening evaluation outcomes into the two C output slots.

use crate::AetherStatus;
use runtime::{ErrorKind, EvalOutcome};
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Tag for null or otherwise unusable arguments at the boundary.
pub const INVALID_ARGUMENT: &str = "InvalidArgument";
/// Tag for a panic caught at the boundary.
pub const INTERNAL: &str = "Internal";

/// One evaluation's output, ready to be handed to C.
///
/// Exactly one of the two slots is filled when this is written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marshalled {
    Result(CString),
    Error { status: AetherStatus, text: CString },
}

impl Marshalled {
    pub fn from_outcome(outcome: EvalOutcome) -> Self {
        match outcome {
            EvalOutcome::Success(text) => Marshalled::Result(to_c_string(text)),
            EvalOutcome::Failure { kind, message } => Marshalled::Error {
                status: AetherStatus::from(kind),
                text: to_c_string(format!("{}: {message}", kind.tag())),
            },
        }
    }

    pub fn invalid_argument(message: &str) -> Self {
        Marshalled::Error {
            status: AetherStatus::NullPointer,
            text: to_c_string(format!("{INVALID_ARGUMENT}: {message}")),
        }
    }

    pub fn internal(message: &str) -> Self {
        Marshalled::Error {
            status: AetherStatus::Panic,
            text: to_c_string(format!("{INTERNAL}: {message}")),
        }
    }

    pub fn status(&self) -> AetherStatus {
        match self {
            Marshalled::Result(_) => AetherStatus::Success,
            Marshalled::Error { status, .. } => *status,
        }
    }

    /// Transfer ownership of the text into one slot and null the other.
    ///
    /// # Safety
    ///
    /// Both pointers must be non-null and valid for writes.
    pub unsafe fn write_to(self, result: *mut *mut c_char, error: *mut *mut c_char) -> AetherStatus {
        let status = self.status();
        let (filled, empty, text) = match self {
            Marshalled::Result(text) => (result, error, text),
            Marshalled::Error { text, .. } => (error, result, text),
        };
        unsafe {
            *empty = ptr::null_mut();
            *filled = text.into_raw();
        }
        status
    }
}

impl From<ErrorKind> for AetherStatus {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Parse => AetherStatus::ParseError,
            ErrorKind::Runtime => AetherStatus::RuntimeError,
            ErrorKind::PermissionDenied => AetherStatus::PermissionDenied,
        }
    }
}

/// Interior NULs become U+FFFD so the conversion cannot fail.
pub fn to_c_string(text: impl Into<String>) -> CString {
    let mut text = text.into();
    if text.contains('\0') {
        text = text.replace('\0', "\u{FFFD}");
    }
    CString::new(text).unwrap_or_default()
}

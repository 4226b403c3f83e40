//! C interface to the Aether engine.
//!
//! Ownership rules:
//!
//! - A handle from [`aether_new`] or [`aether_new_with_permissions`] is
//!   released exactly once with [`aether_free`].
//! - Every string written by [`aether_eval`] is released exactly once with
//!   [`aether_free_string`].
//! - The string from [`aether_version`] is static and must not be freed.
//!
//! No panic crosses the boundary. A panic while evaluating is reported as
//! [`AetherStatus::Panic`] with an `Internal` error string.

pub mod marshal;

use marshal::Marshalled;
use runtime::{Engine, EvalOutcome};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

/// Opaque engine handle. C only ever sees a pointer to it.
pub struct AetherHandle {
    engine: Engine,
}

/// Status codes returned by [`aether_eval`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AetherStatus {
    Success = 0,
    ParseError = 1,
    RuntimeError = 2,
    NullPointer = 3,
    Panic = 4,
    PermissionDenied = 5,
}

impl AetherStatus {
    pub const fn code(self) -> c_int {
        self as c_int
    }
}

fn into_handle(build: fn() -> Engine) -> *mut AetherHandle {
    match panic::catch_unwind(build) {
        Ok(engine) => Box::into_raw(Box::new(AetherHandle { engine })),
        Err(payload) => {
            tracing::error!(panic = panic_message(payload.as_ref()), "engine construction panicked");
            ptr::null_mut()
        }
    }
}

/// Create an engine that may only compute: every privileged builtin is denied.
///
/// Returns null only if construction panicked.
#[unsafe(no_mangle)]
pub extern "C" fn aether_new() -> *mut AetherHandle {
    into_handle(Engine::new)
}

/// Create an engine with every capability granted.
#[unsafe(no_mangle)]
pub extern "C" fn aether_new_with_permissions() -> *mut AetherHandle {
    into_handle(Engine::unrestricted)
}

/// Evaluate NUL-terminated source text.
///
/// On return exactly one of `*result` and `*error` holds a string owned
/// by the caller and the other is null. Error strings have the form
/// `"<Kind>: <message>"`. If `result` or `error` is itself null nothing
/// is written and [`AetherStatus::NullPointer`] is returned.
///
/// # Safety
///
/// `handle` must be null or a live handle not in use by another thread.
/// `code` must be null or point to a NUL-terminated string. `result` and
/// `error` must be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aether_eval(
    handle: *mut AetherHandle,
    code: *const c_char,
    result: *mut *mut c_char,
    error: *mut *mut c_char,
) -> c_int {
    if result.is_null() || error.is_null() {
        return AetherStatus::NullPointer.code();
    }

    let marshalled = if handle.is_null() {
        Marshalled::invalid_argument("engine handle is null")
    } else if code.is_null() {
        Marshalled::invalid_argument("source text is null")
    } else {
        let eval = AssertUnwindSafe(|| {
            let handle = unsafe { &mut *handle };
            let source = unsafe { CStr::from_ptr(code) }.to_bytes();
            EvalOutcome::from(handle.engine.eval_bytes(source))
        });
        match panic::catch_unwind(eval) {
            Ok(outcome) => Marshalled::from_outcome(outcome),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(panic = message, "evaluation panicked");
                Marshalled::internal(message)
            }
        }
    };

    unsafe { marshalled.write_to(result, error) }.code()
}

/// Crate version as a static NUL-terminated string. Do not free.
#[unsafe(no_mangle)]
pub extern "C" fn aether_version() -> *const c_char {
    static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
    VERSION.as_ptr().cast()
}

/// Release an engine. Null is ignored.
///
/// # Safety
///
/// `handle` must be null or a handle from this library that has not been
/// freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aether_free(handle: *mut AetherHandle) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}

/// Release a string written by [`aether_eval`]. Null is ignored.
///
/// # Safety
///
/// `s` must be null or a string from [`aether_eval`] that has not been
/// freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn aether_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { std::ffi::CString::from_raw(s) });
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "panic during evaluation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        let codes = [
            (AetherStatus::Success, 0),
            (AetherStatus::ParseError, 1),
            (AetherStatus::RuntimeError, 2),
            (AetherStatus::NullPointer, 3),
            (AetherStatus::Panic, 4),
            (AetherStatus::PermissionDenied, 5),
        ];
        for (status, code) in codes {
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_version_matches_runtime() {
        let version = unsafe { CStr::from_ptr(aether_version()) };
        assert_eq!(version.to_str().unwrap(), runtime::version());
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&7_u8), "panic during evaluation");
    }
}

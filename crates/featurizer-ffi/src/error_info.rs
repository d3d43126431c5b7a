//! Error Information Objects
//!
//! A failing export stores one of these in the handle registry and writes
//! its handle to the caller's error slot. The caller owns the handle and
//! releases it with `featurizer_destroy_error_info`.

use crate::boundary::{destroy, guard, require_out};
use crate::registry::{lock, registry};
use featurizer_core::{ErrorKind, FeaturizerError};
use libc::c_char;
use std::ffi::CString;

/// Error kind plus a human-readable message
#[derive(Debug)]
pub struct ErrorInfo {
    kind: ErrorKind,
    message: CString,
}

impl ErrorInfo {
    pub fn new(error: &FeaturizerError) -> Self {
        let text = error.to_string().replace('\0', " ");
        Self {
            kind: error.kind(),
            message: CString::new(text).unwrap_or_default(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        self.message.to_str().unwrap_or_default()
    }
}

/// Kind of a registered error, or 0 when `handle` is not an error handle
#[no_mangle]
pub extern "C" fn featurizer_error_info_kind(handle: u64) -> u8 {
    registry()
        .get::<ErrorInfo>(handle)
        .and_then(|info| lock(&info).map(|info| info.kind() as u8))
        .unwrap_or(0)
}

/// Borrow the message of a registered error
///
/// The string stays valid until the error handle is destroyed.
///
/// # Safety
/// - `message_out` and `len_out` must be valid for writes
/// - `error` must be null or valid for writes
#[no_mangle]
pub unsafe extern "C" fn featurizer_error_info_message(
    handle: u64,
    message_out: *mut *const c_char,
    len_out: *mut usize,
    error: *mut u64,
) -> bool {
    guard("featurizer_error_info_message", error, || {
        require_out(message_out, "message out-pointer")?;
        require_out(len_out, "length out-pointer")?;

        let info = registry().get::<ErrorInfo>(handle)?;
        let info = lock(&info)?;
        // The CString lives in the registry, so the pointer outlives the lock
        message_out.write(info.message.as_ptr());
        len_out.write(info.message.as_bytes().len());
        Ok(())
    })
}

/// Release an error handle
///
/// Returns false when `handle` is not a live error handle.
#[no_mangle]
pub extern "C" fn featurizer_destroy_error_info(handle: u64) -> bool {
    destroy::<ErrorInfo>(handle).is_ok()
}

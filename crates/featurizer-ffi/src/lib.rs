//! Featurizer C ABI
//!
//! Exposes estimators and transformers to foreign callers through opaque
//! `u64` handles. Per-instance functions live in [`exports`]; this module
//! holds the shared entry points for logging, diagnostics and releasing
//! buffers the library hands out.

mod boundary;
mod error_info;
pub mod exports;
mod registry;

pub use boundary::{CSlice, Float64Vector, FromC, IntoC, ReleaseC};
pub use error_info::{
    featurizer_destroy_error_info, featurizer_error_info_kind, featurizer_error_info_message,
    ErrorInfo,
};
pub use registry::{registry, HandleRegistry};

use boundary::{guard, release_c_buffer};
use featurizers::HashOneHotEncoding;
use libc::c_char;
use std::ffi::CStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install a global tracing subscriber
///
/// `level` is one of `trace`, `debug`, `info`, `warn`, `error` (null means
/// `info`). Returns false if the level is unknown or a subscriber is
/// already installed.
///
/// # Safety
/// `level` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn featurizer_init_logging(level: *const c_char, json: bool) -> bool {
    let level = if level.is_null() {
        Level::INFO
    } else {
        match CStr::from_ptr(level).to_str().ok().and_then(|s| s.parse().ok()) {
            Some(level) => level,
            None => return false,
        }
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.is_ok()
}

/// Number of objects currently registered, error handles included
#[no_mangle]
pub extern "C" fn featurizer_live_handle_count() -> u64 {
    registry().len().map(|len| len as u64).unwrap_or(0)
}

/// Release a buffer from `<instance>_create_transformer_save_data`
///
/// # Safety
/// `buffer`/`len` must come from a save-data call and not have been
/// released; `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn featurizer_destroy_transformer_save_data(
    buffer: *mut u8,
    len: usize,
    error: *mut u64,
) -> bool {
    guard("featurizer_destroy_transformer_save_data", error, || {
        boundary::destroy_transformer_save_data(buffer, len)
    })
}

/// Release the buffer from a missing-dummies flush
///
/// # Safety
/// `output`/`items` must come from a flush and not have been released;
/// `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn featurizer_destroy_int8_output(
    output: *mut i8,
    items: usize,
    error: *mut u64,
) -> bool {
    guard("featurizer_destroy_int8_output", error, || {
        release_c_buffer(output, items)
    })
}

/// Release the buffer from a standard-scaler flush
///
/// # Safety
/// `output`/`items` must come from a flush and not have been released;
/// `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn featurizer_destroy_float64_output(
    output: *mut f64,
    items: usize,
    error: *mut u64,
) -> bool {
    guard("featurizer_destroy_float64_output", error, || {
        release_c_buffer(output, items)
    })
}

/// Release the buffer from a hash one-hot flush
///
/// # Safety
/// `output`/`items` must come from a flush and not have been released;
/// `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn featurizer_destroy_hash_one_hot_output(
    output: *mut HashOneHotEncoding,
    items: usize,
    error: *mut u64,
) -> bool {
    guard("featurizer_destroy_hash_one_hot_output", error, || {
        release_c_buffer(output, items)
    })
}

/// Release the buffer from an L1-normalize flush, including every vector
///
/// # Safety
/// `output`/`items` must come from a flush and not have been released;
/// `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn featurizer_destroy_float64_vector_output(
    output: *mut Float64Vector,
    items: usize,
    error: *mut u64,
) -> bool {
    guard("featurizer_destroy_float64_vector_output", error, || {
        release_c_buffer(output, items)
    })
}

/// Release one vector written by an L1-normalize transform
///
/// # Safety
/// `vector` must come from a transform and not have been released; `error`
/// must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn featurizer_destroy_float64_vector(
    vector: Float64Vector,
    error: *mut u64,
) -> bool {
    guard("featurizer_destroy_float64_vector", error, || {
        if vector.data.is_null() && vector.len != 0 {
            return Err(featurizer_core::FeaturizerError::invalid_argument(
                "vector data is null",
            ));
        }
        vector.release();
        Ok(())
    })
}

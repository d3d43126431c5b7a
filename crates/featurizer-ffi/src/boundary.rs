//! Boundary Operations
//!
//! Generic implementations behind every exported function. Each export
//! wraps one of these in [`guard`], which turns errors and panics into an
//! error handle so nothing unwinds into the foreign caller.

use crate::error_info::ErrorInfo;
use crate::registry::{lock, registry};
use featurizer_core::{
    Accumulator, Estimator, FeaturizerError, TrainingConfig, Transformer,
};
use featurizers::HashOneHotEncoding;
use libc::c_char;
use std::borrow::Borrow;
use std::ffi::CStr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use tracing::{error, warn};

/// Run `f`, reporting failure through the `error` slot
///
/// # Safety
/// `error` must be null or valid for writes.
pub(crate) unsafe fn guard<F>(operation: &'static str, error: *mut u64, f: F) -> bool
where
    F: FnOnce() -> Result<(), FeaturizerError>,
{
    if error.is_null() {
        return false;
    }
    error.write(0);

    let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(FeaturizerError::Internal(panic_message(payload.as_ref()))),
    };

    match outcome {
        Ok(()) => true,
        Err(err) => {
            warn!("{} failed: {}", operation, err);
            metrics::counter!("featurizer_ffi_faults_total", "kind" => err.kind().as_str())
                .increment(1);
            match registry().add(ErrorInfo::new(&err)) {
                Ok(handle) => error.write(handle),
                Err(e) => error!("Could not register error for {}: {}", operation, e),
            }
            false
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic with unknown payload".to_string()
    }
}

/// Reject a null out-pointer before any state changes
pub(crate) fn require_out<T>(ptr: *mut T, name: &str) -> Result<(), FeaturizerError> {
    if ptr.is_null() {
        Err(FeaturizerError::InvalidArgument(format!("{} is null", name)))
    } else {
        Ok(())
    }
}

/// Limits applied to estimators created through the boundary
pub(crate) fn training_config() -> &'static TrainingConfig {
    static CONFIG: OnceLock<TrainingConfig> = OnceLock::new();
    CONFIG.get_or_init(|| {
        TrainingConfig::load().unwrap_or_else(|e| {
            warn!("Ignoring invalid training config: {}", e);
            TrainingConfig::default()
        })
    })
}

/// Borrowed vector passed by value across the boundary
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CSlice<T> {
    pub data: *const T,
    pub len: usize,
}

/// Vector owned by the library until released with
/// `featurizer_destroy_float64_vector`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Float64Vector {
    pub data: *mut f64,
    pub len: usize,
}

impl Float64Vector {
    pub const fn null() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
        }
    }
}

/// Conversion of a raw boundary argument into an owned item
pub trait FromC: Sized {
    type Raw: Copy;

    /// # Safety
    /// Pointers inside `raw` must be null or valid for the declared length.
    unsafe fn from_c(raw: Self::Raw) -> Result<Self, FeaturizerError>;
}

macro_rules! from_c_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromC for $ty {
                type Raw = $ty;

                unsafe fn from_c(raw: $ty) -> Result<Self, FeaturizerError> {
                    Ok(raw)
                }
            }
        )*
    };
}

from_c_identity!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool);

impl FromC for String {
    type Raw = *const c_char;

    unsafe fn from_c(raw: *const c_char) -> Result<Self, FeaturizerError> {
        if raw.is_null() {
            return Err(FeaturizerError::invalid_argument("string input is null"));
        }
        CStr::from_ptr(raw)
            .to_str()
            .map(str::to_owned)
            .map_err(|e| FeaturizerError::InvalidArgument(format!("string input is not UTF-8: {}", e)))
    }
}

impl<T: Copy> FromC for Vec<T> {
    type Raw = CSlice<T>;

    unsafe fn from_c(raw: CSlice<T>) -> Result<Self, FeaturizerError> {
        if raw.len == 0 {
            return Ok(Vec::new());
        }
        if raw.data.is_null() {
            return Err(FeaturizerError::invalid_argument("vector input is null"));
        }
        Ok(std::slice::from_raw_parts(raw.data, raw.len).to_vec())
    }
}

/// Conversion of a transformer output into its boundary representation
pub trait IntoC {
    type C: ReleaseC;

    fn into_c(self) -> Self::C;
}

/// Frees whatever a boundary value owns
pub trait ReleaseC: Sized {
    /// # Safety
    /// `self` must have been produced by [`IntoC::into_c`] and not released.
    unsafe fn release(self) {}
}

macro_rules! plain_c {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoC for $ty {
                type C = $ty;

                fn into_c(self) -> $ty {
                    self
                }
            }

            impl ReleaseC for $ty {}
        )*
    };
}

plain_c!(i8, f64, HashOneHotEncoding);

impl IntoC for Vec<f64> {
    type C = Float64Vector;

    fn into_c(self) -> Float64Vector {
        let len = self.len();
        let data = Box::into_raw(self.into_boxed_slice()) as *mut f64;
        Float64Vector { data, len }
    }
}

impl ReleaseC for Float64Vector {
    unsafe fn release(self) {
        if !self.data.is_null() {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                self.data, self.len,
            )));
        }
    }
}

/// Hand a sequence to the caller as one allocation
///
/// An empty sequence is reported as a null pointer with zero items.
pub(crate) fn into_c_buffer<O: IntoC>(items: Vec<O>) -> (*mut O::C, usize) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let converted: Box<[O::C]> = items.into_iter().map(IntoC::into_c).collect();
    let len = converted.len();
    (Box::into_raw(converted) as *mut O::C, len)
}

/// Release a buffer produced by [`into_c_buffer`]
///
/// # Safety
/// `ptr`/`items` must come from `into_c_buffer` and not have been released.
pub(crate) unsafe fn release_c_buffer<C: ReleaseC>(
    ptr: *mut C,
    items: usize,
) -> Result<(), FeaturizerError> {
    if ptr.is_null() {
        return if items == 0 {
            Ok(())
        } else {
            Err(FeaturizerError::invalid_argument("output buffer is null"))
        };
    }
    if items == 0 {
        return Err(FeaturizerError::invalid_argument("output buffer has no items"));
    }

    let buffer = Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, items));
    for item in buffer.into_vec() {
        item.release();
    }
    Ok(())
}

/// Create an estimator, start training and register it
///
/// # Safety
/// `out` must be null or valid for writes.
pub(crate) unsafe fn create_estimator<A, F>(make: F, out: *mut u64) -> Result<(), FeaturizerError>
where
    A: Accumulator + 'static,
    F: FnOnce(&TrainingConfig) -> Result<Estimator<A>, FeaturizerError>,
{
    require_out(out, "estimator out-pointer")?;
    let mut estimator = make(training_config())?;
    estimator.begin_training()?;
    let handle = registry().add(estimator)?;
    out.write(handle);
    Ok(())
}

pub(crate) fn destroy<T: Send + 'static>(handle: u64) -> Result<(), FeaturizerError> {
    drop(registry().remove::<T>(handle)?);
    Ok(())
}

/// Run `f` against a registered estimator
pub(crate) fn with_estimator<A, R, F>(handle: u64, f: F) -> Result<R, FeaturizerError>
where
    A: Accumulator + 'static,
    F: FnOnce(&mut Estimator<A>) -> Result<R, FeaturizerError>,
{
    let estimator = registry().get::<Estimator<A>>(handle)?;
    let mut estimator = lock(&estimator)?;
    f(&mut estimator)
}

/// Run `f` against a registered transformer
pub(crate) fn with_transformer<T, R, F>(handle: u64, f: F) -> Result<R, FeaturizerError>
where
    T: Transformer + 'static,
    F: FnOnce(&mut T) -> Result<R, FeaturizerError>,
{
    let transformer = registry().get::<T>(handle)?;
    let mut transformer = lock(&transformer)?;
    f(&mut transformer)
}

/// # Safety
/// `out` must be null or valid for writes.
pub(crate) unsafe fn get_state<A>(handle: u64, out: *mut u8) -> Result<(), FeaturizerError>
where
    A: Accumulator + 'static,
{
    require_out(out, "state out-pointer")?;
    let state = with_estimator::<A, _, _>(handle, |estimator| Ok(estimator.get_state()))?;
    out.write(state as u8);
    Ok(())
}

/// # Safety
/// `out` must be null or valid for writes.
pub(crate) unsafe fn is_training_complete<A>(handle: u64, out: *mut bool) -> Result<(), FeaturizerError>
where
    A: Accumulator + 'static,
{
    require_out(out, "completion out-pointer")?;
    let complete = with_estimator::<A, _, _>(handle, |estimator| Ok(estimator.is_training_complete()))?;
    out.write(complete);
    Ok(())
}

/// # Safety
/// Pointers inside `input` must be valid; `out` must be null or valid for writes.
pub(crate) unsafe fn fit<A>(
    handle: u64,
    input: <A::Input as FromC>::Raw,
    out: *mut u8,
) -> Result<(), FeaturizerError>
where
    A: Accumulator + 'static,
    A::Input: FromC,
{
    require_out(out, "fit result out-pointer")?;
    let item = A::Input::from_c(input)?;
    let result = with_estimator::<A, _, _>(handle, |estimator| estimator.fit(&item))?;
    out.write(result as u8);
    Ok(())
}

/// # Safety
/// `input` must be null or valid for `items` reads; `out` must be null or
/// valid for writes.
pub(crate) unsafe fn fit_buffer<A>(
    handle: u64,
    input: *const <A::Input as FromC>::Raw,
    items: usize,
    out: *mut u8,
) -> Result<(), FeaturizerError>
where
    A: Accumulator + 'static,
    A::Input: FromC,
{
    require_out(out, "fit result out-pointer")?;
    if input.is_null() {
        return Err(FeaturizerError::invalid_argument("input buffer is null"));
    }
    if items == 0 {
        return Err(FeaturizerError::invalid_argument("input buffer is empty"));
    }

    let batch = std::slice::from_raw_parts(input, items)
        .iter()
        .map(|&raw| A::Input::from_c(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let result = with_estimator::<A, _, _>(handle, |estimator| estimator.fit_batch(&batch))?;
    out.write(result as u8);
    Ok(())
}

pub(crate) fn on_data_completed<A>(handle: u64) -> Result<(), FeaturizerError>
where
    A: Accumulator + 'static,
{
    with_estimator::<A, _, _>(handle, |estimator| estimator.on_data_completed())
}

pub(crate) fn complete_training<A>(handle: u64) -> Result<(), FeaturizerError>
where
    A: Accumulator + 'static,
{
    with_estimator::<A, _, _>(handle, |estimator| estimator.complete_training())
}

/// # Safety
/// `out` must be null or valid for writes.
pub(crate) unsafe fn create_transformer_from_estimator<A>(
    handle: u64,
    out: *mut u64,
) -> Result<(), FeaturizerError>
where
    A: Accumulator + 'static,
    A::Transformer: 'static,
{
    require_out(out, "transformer out-pointer")?;
    let transformer = with_estimator::<A, _, _>(handle, |estimator| estimator.create_transformer())?;
    out.write(registry().add(transformer)?);
    Ok(())
}

/// # Safety
/// `buffer` must be null or valid for `len` reads; `out` must be null or
/// valid for writes.
pub(crate) unsafe fn create_transformer_from_saved_data<T>(
    buffer: *const u8,
    len: usize,
    out: *mut u64,
) -> Result<(), FeaturizerError>
where
    T: Transformer + 'static,
{
    require_out(out, "transformer out-pointer")?;
    if buffer.is_null() {
        return Err(FeaturizerError::invalid_argument("saved data buffer is null"));
    }
    if len == 0 {
        return Err(FeaturizerError::invalid_argument("saved data buffer is empty"));
    }

    let transformer = T::from_bytes(std::slice::from_raw_parts(buffer, len))?;
    out.write(registry().add(transformer)?);
    Ok(())
}

/// # Safety
/// `buffer_out` and `len_out` must be null or valid for writes.
pub(crate) unsafe fn create_transformer_save_data<T>(
    handle: u64,
    buffer_out: *mut *mut u8,
    len_out: *mut usize,
) -> Result<(), FeaturizerError>
where
    T: Transformer + 'static,
{
    require_out(buffer_out, "buffer out-pointer")?;
    require_out(len_out, "length out-pointer")?;

    let bytes = with_transformer::<T, _, _>(handle, |transformer| transformer.to_bytes())?
        .into_boxed_slice();
    let len = bytes.len();
    buffer_out.write(Box::into_raw(bytes) as *mut u8);
    len_out.write(len);
    Ok(())
}

/// Release a buffer produced by [`create_transformer_save_data`]
///
/// # Safety
/// `buffer`/`len` must come from `create_transformer_save_data` and not have
/// been released.
pub(crate) unsafe fn destroy_transformer_save_data(
    buffer: *mut u8,
    len: usize,
) -> Result<(), FeaturizerError> {
    if buffer.is_null() {
        return Err(FeaturizerError::invalid_argument("saved data buffer is null"));
    }
    if len == 0 {
        return Err(FeaturizerError::invalid_argument("saved data buffer is empty"));
    }
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(buffer, len)));
    Ok(())
}

/// # Safety
/// Pointers inside `input` must be valid; `out` must be null or valid for writes.
pub(crate) unsafe fn transform<T, In>(
    handle: u64,
    input: In::Raw,
    out: *mut <T::Output as IntoC>::C,
) -> Result<(), FeaturizerError>
where
    T: Transformer + 'static,
    T::Output: IntoC,
    In: FromC + Borrow<T::Input>,
{
    require_out(out, "output out-pointer")?;
    let item = In::from_c(input)?;
    let output = with_transformer::<T, _, _>(handle, |transformer| {
        transformer.execute(Borrow::<T::Input>::borrow(&item))
    })?;
    out.write(output.into_c());
    Ok(())
}

/// # Safety
/// `output_out` and `items_out` must be null or valid for writes.
pub(crate) unsafe fn flush<T>(
    handle: u64,
    output_out: *mut *mut <T::Output as IntoC>::C,
    items_out: *mut usize,
) -> Result<(), FeaturizerError>
where
    T: Transformer + 'static,
    T::Output: IntoC,
{
    require_out(output_out, "output out-pointer")?;
    require_out(items_out, "item count out-pointer")?;

    let outputs = with_transformer::<T, _, _>(handle, |transformer| transformer.flush())?;
    let (ptr, items) = into_c_buffer(outputs);
    output_out.write(ptr);
    items_out.write(items);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurizer_core::ErrorKind;

    fn error_kind(handle: u64) -> ErrorKind {
        let info = registry().get::<ErrorInfo>(handle).unwrap();
        lock(&info).map(|info| info.kind()).unwrap()
    }

    #[test]
    fn test_guard_success_clears_slot() {
        let mut error = 99u64;
        assert!(unsafe { guard("noop", &mut error, || Ok(())) });
        assert_eq!(error, 0);
    }

    #[test]
    fn test_guard_reports_error() {
        let mut error = 0u64;
        let ok = unsafe {
            guard("failing", &mut error, || {
                Err(FeaturizerError::invalid_argument("bad"))
            })
        };
        assert!(!ok);
        assert_ne!(error, 0);
        assert_eq!(error_kind(error), ErrorKind::InvalidArgument);
        destroy::<ErrorInfo>(error).unwrap();
    }

    #[test]
    fn test_guard_catches_panics() {
        let mut error = 0u64;
        let ok = unsafe { guard("panicking", &mut error, || panic!("boom")) };
        assert!(!ok);
        assert_eq!(error_kind(error), ErrorKind::InternalFault);
        destroy::<ErrorInfo>(error).unwrap();
    }

    #[test]
    fn test_guard_with_null_slot_does_nothing() {
        let mut ran = false;
        let ok = unsafe {
            guard("unreported", std::ptr::null_mut(), || {
                ran = true;
                Ok(())
            })
        };
        assert!(!ok);
        assert!(!ran);
    }

    #[test]
    fn test_string_from_c() {
        let text = std::ffi::CString::new("hello").unwrap();
        assert_eq!(unsafe { String::from_c(text.as_ptr()) }.unwrap(), "hello");
        assert!(unsafe { String::from_c(std::ptr::null()) }.is_err());
    }

    #[test]
    fn test_vector_from_c() {
        let data = [1i32, 2, 3];
        let slice = CSlice {
            data: data.as_ptr(),
            len: data.len(),
        };
        assert_eq!(unsafe { Vec::<i32>::from_c(slice) }.unwrap(), vec![1, 2, 3]);

        let null = CSlice::<i32> {
            data: std::ptr::null(),
            len: 2,
        };
        assert!(unsafe { Vec::<i32>::from_c(null) }.is_err());
    }

    #[test]
    fn test_c_buffer_round_trip() {
        let (ptr, items) = into_c_buffer(vec![vec![0.5f64, 0.5], vec![1.0]]);
        assert_eq!(items, 2);
        let second = unsafe { *ptr.add(1) };
        assert_eq!(second.len, 1);
        assert_eq!(unsafe { *second.data }, 1.0);
        unsafe { release_c_buffer(ptr, items) }.unwrap();
    }

    #[test]
    fn test_empty_c_buffer_is_null() {
        let (ptr, items) = into_c_buffer(Vec::<i8>::new());
        assert!(ptr.is_null());
        assert_eq!(items, 0);
        unsafe { release_c_buffer(ptr, items) }.unwrap();
    }
}

//! Handle Registry
//!
//! Maps opaque `u64` handles to heap objects so foreign callers never see a
//! native pointer. Handles start at 1 and are never reused; 0 means null.

use featurizer_core::FeaturizerError;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tracing::debug;

type Entry = Arc<dyn Any + Send + Sync>;

/// Table of live handles
///
/// Each object sits behind its own `Mutex`, so registry operations on
/// different handles never contend on the object itself.
#[derive(Debug)]
pub struct HandleRegistry {
    next: AtomicU64,
    entries: RwLock<HashMap<u64, Entry>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register `object` and return its new handle
    pub fn add<T: Send + 'static>(&self, object: T) -> Result<u64, FeaturizerError> {
        let handle = self.next.fetch_add(1, Ordering::Relaxed);
        let mut entries = self
            .entries
            .write()
            .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))?;

        entries.insert(handle, Arc::new(Mutex::new(object)));
        metrics::gauge!("featurizer_ffi_live_handles").set(entries.len() as f64);
        debug!("Registered {} as handle {}", std::any::type_name::<T>(), handle);
        Ok(handle)
    }

    /// Look up a live handle of type `T`
    ///
    /// A handle registered with a different type is reported as not found.
    pub fn get<T: Send + 'static>(&self, handle: u64) -> Result<Arc<Mutex<T>>, FeaturizerError> {
        check_not_null(handle)?;
        let entries = self
            .entries
            .read()
            .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))?;

        entries
            .get(&handle)
            .cloned()
            .and_then(|entry| entry.downcast::<Mutex<T>>().ok())
            .ok_or(FeaturizerError::HandleNotFound(handle))
    }

    /// Break the mapping for `handle` and hand the object back to the caller
    ///
    /// Fails with `HandleNotFound` on a second removal.
    pub fn remove<T: Send + 'static>(&self, handle: u64) -> Result<Arc<Mutex<T>>, FeaturizerError> {
        check_not_null(handle)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))?;

        let is_type = entries
            .get(&handle)
            .map(|entry| entry.is::<Mutex<T>>())
            .unwrap_or(false);
        if !is_type {
            return Err(FeaturizerError::HandleNotFound(handle));
        }

        let entry = entries
            .remove(&handle)
            .ok_or(FeaturizerError::HandleNotFound(handle))?;
        metrics::gauge!("featurizer_ffi_live_handles").set(entries.len() as f64);
        debug!("Removed handle {}", handle);

        entry
            .downcast::<Mutex<T>>()
            .map_err(|_| FeaturizerError::HandleNotFound(handle))
    }

    /// Number of live handles
    pub fn len(&self) -> Result<usize, FeaturizerError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, FeaturizerError> {
        Ok(self.len()? == 0)
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn check_not_null(handle: u64) -> Result<(), FeaturizerError> {
    if handle == 0 {
        Err(FeaturizerError::invalid_argument("null handle"))
    } else {
        Ok(())
    }
}

/// Process-wide registry behind every exported function
pub fn registry() -> &'static HandleRegistry {
    static REGISTRY: OnceLock<HandleRegistry> = OnceLock::new();
    REGISTRY.get_or_init(HandleRegistry::new)
}

/// Lock an object taken from the registry
pub(crate) fn lock<T>(object: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, FeaturizerError> {
    object
        .lock()
        .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurizer_core::ErrorKind;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_add_and_get() {
        let registry = HandleRegistry::new();
        let handle = registry.add(String::from("estimator")).unwrap();
        assert_ne!(handle, 0);

        let object = registry.get::<String>(handle).unwrap();
        assert_eq!(*lock(&object).unwrap(), "estimator");
    }

    #[test]
    fn test_get_after_remove_fails() {
        let registry = HandleRegistry::new();
        let handle = registry.add(7u32).unwrap();
        let removed = registry.remove::<u32>(handle).unwrap();
        assert_eq!(*lock(&removed).unwrap(), 7);

        assert_eq!(
            registry.get::<u32>(handle).unwrap_err(),
            FeaturizerError::HandleNotFound(handle)
        );
        assert_eq!(
            registry.remove::<u32>(handle).unwrap_err(),
            FeaturizerError::HandleNotFound(handle)
        );
    }

    #[test]
    fn test_wrong_type_is_not_found_and_not_removed() {
        let registry = HandleRegistry::new();
        let handle = registry.add(7u32).unwrap();

        assert_eq!(registry.get::<i64>(handle).unwrap_err().kind(), ErrorKind::HandleNotFound);
        assert!(registry.remove::<i64>(handle).is_err());
        assert!(registry.get::<u32>(handle).is_ok());
    }

    #[test]
    fn test_never_issued_handle() {
        let registry = HandleRegistry::new();
        assert_eq!(
            registry.get::<u32>(12345).unwrap_err(),
            FeaturizerError::HandleNotFound(12345)
        );
    }

    #[test]
    fn test_null_handle_is_invalid_argument() {
        let registry = HandleRegistry::new();
        assert_eq!(registry.get::<u32>(0).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(registry.remove::<u32>(0).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_handles_are_not_reused() {
        let registry = HandleRegistry::new();
        let first = registry.add(1u8).unwrap();
        registry.remove::<u8>(first).unwrap();
        let second = registry.add(2u8).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_adds_are_unique() {
        let registry = Arc::new(HandleRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..200)
                        .map(|i| registry.add(i as u64).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for thread in threads {
            for handle in thread.join().unwrap() {
                assert!(seen.insert(handle));
            }
        }
        assert_eq!(registry.len().unwrap(), 1600);
    }

    proptest! {
        #[test]
        fn prop_live_handles_are_unique(ops in proptest::collection::vec(any::<bool>(), 1..64)) {
            let registry = HandleRegistry::new();
            let mut live: Vec<u64> = Vec::new();
            for add in ops {
                if add || live.is_empty() {
                    let handle = registry.add(()).unwrap();
                    prop_assert!(!live.contains(&handle));
                    live.push(handle);
                } else {
                    let handle = live.remove(0);
                    registry.remove::<()>(handle).unwrap();
                    prop_assert!(registry.get::<()>(handle).is_err());
                }
            }
            prop_assert_eq!(registry.len().unwrap(), live.len());
        }
    }
}

//! Annotation Store
//!
//! Column-indexed side channel through which one estimator publishes
//! statistics that a later estimator in the same pipeline reads while it
//! trains. Values are arbitrary `Send + Sync` objects keyed by producer name.

use crate::{FeaturizerError, TrainingState};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

type AnnotationValue = Arc<dyn Any + Send + Sync>;

/// Statistics shared between estimators of one pipeline
#[derive(Debug)]
pub struct AnnotationStore {
    columns: RwLock<Vec<HashMap<String, AnnotationValue>>>,
}

impl AnnotationStore {
    /// Create a store with `num_columns` empty slots
    pub fn new(num_columns: usize) -> Self {
        Self {
            columns: RwLock::new(vec![HashMap::new(); num_columns]),
        }
    }

    /// Number of column slots
    pub fn num_columns(&self) -> Result<usize, FeaturizerError> {
        let columns = self
            .columns
            .read()
            .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))?;
        Ok(columns.len())
    }

    /// Store `value` under `key`, replacing any previous value
    pub(crate) fn publish<T: Any + Send + Sync>(
        &self,
        column: usize,
        key: &str,
        value: T,
    ) -> Result<(), FeaturizerError> {
        let mut columns = self
            .columns
            .write()
            .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))?;
        let slot = column_slot(columns.len(), column)?;

        columns[slot].insert(key.to_string(), Arc::new(value));
        debug!("Published annotation '{}' for column {}", key, column);
        Ok(())
    }

    /// Look up `key`
    ///
    /// Returns `None` when nothing was published under `key` or the published
    /// value is not a `T`.
    pub fn read<T: Any + Send + Sync>(
        &self,
        column: usize,
        key: &str,
    ) -> Result<Option<Arc<T>>, FeaturizerError> {
        let columns = self
            .columns
            .read()
            .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))?;
        let slot = column_slot(columns.len(), column)?;

        Ok(columns[slot]
            .get(key)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok()))
    }

    /// Check if anything was published under `key`
    pub fn contains(&self, column: usize, key: &str) -> Result<bool, FeaturizerError> {
        let columns = self
            .columns
            .read()
            .map_err(|e| FeaturizerError::Internal(format!("Lock error: {}", e)))?;
        let slot = column_slot(columns.len(), column)?;
        Ok(columns[slot].contains_key(key))
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(1)
    }
}

fn column_slot(num_columns: usize, column: usize) -> Result<usize, FeaturizerError> {
    if column < num_columns {
        Ok(column)
    } else {
        Err(FeaturizerError::InvalidArgument(format!(
            "column {} is out of range for {} annotation columns",
            column, num_columns
        )))
    }
}

/// View of the annotation store handed to an accumulator
///
/// Reads are always allowed. Publishing is allowed while training and at the
/// moment the estimator finishes, never before training starts.
#[derive(Debug, Clone, Copy)]
pub struct TrainingContext<'a> {
    store: &'a AnnotationStore,
    column: usize,
    producer: &'static str,
    state: TrainingState,
    pass: u32,
}

impl<'a> TrainingContext<'a> {
    pub(crate) fn new(
        store: &'a AnnotationStore,
        column: usize,
        producer: &'static str,
        state: TrainingState,
        pass: u32,
    ) -> Self {
        Self {
            store,
            column,
            producer,
            state,
            pass,
        }
    }

    /// Column this estimator trains on
    pub fn column(&self) -> usize {
        self.column
    }

    /// Current pass, starting at 1 once training begins
    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Publish `value` keyed by the estimator's own name
    pub fn publish<T: Any + Send + Sync>(&self, value: T) -> Result<(), FeaturizerError> {
        if self.state == TrainingState::Pending {
            return Err(FeaturizerError::InvalidState {
                operation: "publish",
                state: self.state,
            });
        }
        self.store.publish(self.column, self.producer, value)
    }

    /// Read what `producer` published for this column
    pub fn read<T: Any + Send + Sync>(&self, producer: &str) -> Result<Option<Arc<T>>, FeaturizerError> {
        self.store.read(self.column, producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Mean(f64);

    #[test]
    fn test_missing_entry_is_not_an_error() {
        let store = AnnotationStore::new(2);
        assert!(store.read::<Mean>(1, "Scaler").unwrap().is_none());
        assert!(!store.contains(0, "Scaler").unwrap());
    }

    #[test]
    fn test_last_write_wins() {
        let store = AnnotationStore::new(1);
        store.publish(0, "Scaler", Mean(1.0)).unwrap();
        store.publish(0, "Scaler", Mean(2.0)).unwrap();

        let value = store.read::<Mean>(0, "Scaler").unwrap().unwrap();
        assert_eq!(*value, Mean(2.0));
    }

    #[test]
    fn test_columns_are_independent() {
        let store = AnnotationStore::new(2);
        store.publish(0, "Scaler", Mean(1.0)).unwrap();
        assert!(store.read::<Mean>(1, "Scaler").unwrap().is_none());
    }

    #[test]
    fn test_wrong_type_reads_as_absent() {
        let store = AnnotationStore::new(1);
        store.publish(0, "Scaler", 7u32).unwrap();
        assert!(store.read::<Mean>(0, "Scaler").unwrap().is_none());
        assert!(store.contains(0, "Scaler").unwrap());
    }

    #[test]
    fn test_out_of_range_column() {
        let store = AnnotationStore::new(1);
        let err = store.read::<Mean>(1, "Scaler").unwrap_err();
        assert!(matches!(err, FeaturizerError::InvalidArgument(_)));
    }

    #[test]
    fn test_context_rejects_publish_before_training() {
        let store = AnnotationStore::new(1);
        let pending = TrainingContext::new(&store, 0, "Scaler", TrainingState::Pending, 0);
        assert!(pending.publish(Mean(1.0)).is_err());
        assert!(pending.read::<Mean>("Scaler").unwrap().is_none());

        let training = TrainingContext::new(&store, 0, "Scaler", TrainingState::Training, 1);
        training.publish(Mean(1.0)).unwrap();
        assert!(pending.read::<Mean>("Scaler").unwrap().is_some());
    }

    #[test]
    fn test_concurrent_publish_and_read() {
        let store = Arc::new(AnnotationStore::new(4));
        let threads: Vec<_> = (0..4)
            .map(|column| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.publish(column, "Counter", i as u64).unwrap();
                        store.read::<u64>(column, "Counter").unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        for column in 0..4 {
            assert_eq!(*store.read::<u64>(column, "Counter").unwrap().unwrap(), 99);
        }
    }
}

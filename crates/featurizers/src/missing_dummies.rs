//! Missing Dummies
//!
//! Indicator column: 1 when a value is null, 0 otherwise.

use featurizer_core::{
    AnnotationStore, ArchiveFormat, ArchiveReader, ArchiveWriter, Estimator, FeaturizerError,
    InferenceOnly, Nullable, TrainingConfig, Transformer,
};
use std::marker::PhantomData;
use std::sync::Arc;

pub const MISSING_DUMMIES: &str = "MissingDummies";

pub struct MissingDummiesTransformer<T> {
    _input: PhantomData<fn(&T)>,
}

impl<T> MissingDummiesTransformer<T> {
    pub fn new() -> Self {
        Self {
            _input: PhantomData,
        }
    }
}

impl<T> Default for MissingDummiesTransformer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MissingDummiesTransformer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for MissingDummiesTransformer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MissingDummiesTransformer")
    }
}

impl<T: Nullable> Transformer for MissingDummiesTransformer<T> {
    type Input = T;
    type Output = i8;

    const FORMAT: ArchiveFormat = ArchiveFormat::new(0x0003, 1, 0);

    fn execute(&mut self, input: &T) -> Result<i8, FeaturizerError> {
        Ok(if input.is_null() { 1 } else { 0 })
    }

    fn save_fields(&self, _writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        Ok(())
    }

    fn load_fields(_reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        Ok(Self::new())
    }
}

pub type MissingDummiesEstimator<T> = Estimator<InferenceOnly<MissingDummiesTransformer<T>, T>>;

pub fn missing_dummies_estimator<T: Nullable>(
    annotations: Arc<AnnotationStore>,
    column: usize,
    config: TrainingConfig,
) -> Result<MissingDummiesEstimator<T>, FeaturizerError> {
    Estimator::with_config(
        InferenceOnly::new(MISSING_DUMMIES, MissingDummiesTransformer::new()),
        annotations,
        column,
        config,
    )
}

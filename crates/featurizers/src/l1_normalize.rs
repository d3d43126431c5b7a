//! L1 Normalization
//!
//! Scales a vector so the absolute values of its elements sum to 1. Null
//! elements (NaN) pass through as NaN and do not contribute to the norm.

use featurizer_core::{
    AnnotationStore, ArchiveFormat, ArchiveReader, ArchiveWriter, Estimator, FeaturizerError,
    InferenceOnly, Numeric, TrainingConfig, Transformer,
};
use std::marker::PhantomData;
use std::sync::Arc;

pub const L1_NORMALIZE: &str = "L1Normalize";

/// Divides every element by the vector's L1 norm
pub struct L1NormalizeTransformer<T> {
    _element: PhantomData<fn(&T)>,
}

impl<T> L1NormalizeTransformer<T> {
    pub fn new() -> Self {
        Self {
            _element: PhantomData,
        }
    }
}

impl<T> Default for L1NormalizeTransformer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for L1NormalizeTransformer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for L1NormalizeTransformer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("L1NormalizeTransformer")
    }
}

/// Sum of absolute values, skipping NaN
pub fn l1_norm<T: Numeric>(values: &[T]) -> f64 {
    values
        .iter()
        .map(|v| v.to_f64())
        .filter(|v| !v.is_nan())
        .map(f64::abs)
        .sum()
}

impl<T: Numeric> Transformer for L1NormalizeTransformer<T> {
    type Input = [T];
    type Output = Vec<f64>;

    const FORMAT: ArchiveFormat = ArchiveFormat::new(0x0002, 1, 0);

    fn execute(&mut self, input: &[T]) -> Result<Vec<f64>, FeaturizerError> {
        if input.is_empty() {
            return Err(FeaturizerError::invalid_argument(
                "L1Normalize: input vector is empty",
            ));
        }

        let norm = l1_norm(input);
        if norm == 0.0 || !norm.is_finite() {
            return Err(FeaturizerError::InvalidArgument(format!(
                "L1Normalize: norm must be finite and non-zero, got {}",
                norm
            )));
        }

        Ok(input.iter().map(|v| v.to_f64() / norm).collect())
    }

    fn save_fields(&self, _writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        Ok(())
    }

    fn load_fields(_reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        Ok(Self::new())
    }
}

/// Estimator fed whole vectors
pub type L1NormalizeEstimator<T> = Estimator<InferenceOnly<L1NormalizeTransformer<T>, Vec<T>>>;

pub fn l1_normalize_estimator<T: Numeric>(
    annotations: Arc<AnnotationStore>,
    column: usize,
    config: TrainingConfig,
) -> Result<L1NormalizeEstimator<T>, FeaturizerError> {
    Estimator::with_config(
        InferenceOnly::new(L1_NORMALIZE, L1NormalizeTransformer::new()),
        annotations,
        column,
        config,
    )
}

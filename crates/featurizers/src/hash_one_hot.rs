//! Hash One-Hot Vectorizer
//!
//! Maps a value to a single hot column of a `num_columns`-wide sparse
//! vector by hashing it. Needs no training data.

use crate::hashing::stable_hash;
use featurizer_core::{
    AnnotationStore, ArchiveFormat, ArchiveReader, ArchiveWriter, Estimator, FeaturizerError,
    HashBytes, InferenceOnly, TrainingConfig, Transformer,
};
use std::marker::PhantomData;
use std::sync::Arc;

pub const HASH_ONE_HOT_VECTORIZER: &str = "HashOneHotVectorizer";

/// Single set column of a sparse vector
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashOneHotEncoding {
    pub column_index: u32,
    pub num_columns: u32,
    pub value: bool,
}

/// Hashes `T` values into one of `num_columns` columns
pub struct HashOneHotVectorizerTransformer<T: ?Sized> {
    seed: u32,
    num_columns: u32,
    _input: PhantomData<fn(&T)>,
}

impl<T: ?Sized> HashOneHotVectorizerTransformer<T> {
    pub fn new(seed: u32, num_columns: u32) -> Result<Self, FeaturizerError> {
        if num_columns == 0 {
            return Err(FeaturizerError::invalid_argument(
                "HashOneHotVectorizer: num_columns must be greater than 0",
            ));
        }
        Ok(Self {
            seed,
            num_columns,
            _input: PhantomData,
        })
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn num_columns(&self) -> u32 {
        self.num_columns
    }
}

impl<T: ?Sized> Clone for HashOneHotVectorizerTransformer<T> {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            num_columns: self.num_columns,
            _input: PhantomData,
        }
    }
}

impl<T: ?Sized> PartialEq for HashOneHotVectorizerTransformer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed && self.num_columns == other.num_columns
    }
}

impl<T: ?Sized> std::fmt::Debug for HashOneHotVectorizerTransformer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashOneHotVectorizerTransformer")
            .field("seed", &self.seed)
            .field("num_columns", &self.num_columns)
            .finish()
    }
}

impl<T: HashBytes + ?Sized> Transformer for HashOneHotVectorizerTransformer<T> {
    type Input = T;
    type Output = HashOneHotEncoding;

    const FORMAT: ArchiveFormat = ArchiveFormat::new(0x0001, 1, 0);

    fn execute(&mut self, input: &T) -> Result<HashOneHotEncoding, FeaturizerError> {
        Ok(HashOneHotEncoding {
            column_index: stable_hash(input, self.seed) % self.num_columns,
            num_columns: self.num_columns,
            value: true,
        })
    }

    fn save_fields(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        writer.write_u32(self.seed).write_u32(self.num_columns);
        Ok(())
    }

    fn load_fields(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        let seed = reader.read_u32()?;
        let offset = reader.offset();
        let num_columns = reader.read_u32()?;
        Self::new(seed, num_columns).map_err(|e| FeaturizerError::Deserialization {
            offset,
            reason: e.to_string(),
        })
    }
}

/// Estimator for values of type `T` fed as `In` (`String` for `str`)
pub type HashOneHotVectorizerEstimator<T: ?Sized, In> =
    Estimator<InferenceOnly<HashOneHotVectorizerTransformer<T>, In>>;

pub fn hash_one_hot_vectorizer_estimator<T, In>(
    seed: u32,
    num_columns: u32,
    annotations: Arc<AnnotationStore>,
    column: usize,
    config: TrainingConfig,
) -> Result<HashOneHotVectorizerEstimator<T, In>, FeaturizerError>
where
    T: HashBytes + ?Sized,
{
    let prototype = HashOneHotVectorizerTransformer::new(seed, num_columns)?;
    Estimator::with_config(
        InferenceOnly::new(HASH_ONE_HOT_VECTORIZER, prototype),
        annotations,
        column,
        config,
    )
}

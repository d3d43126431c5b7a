//! Featurizers
//!
//! Concrete estimator/transformer pairs built on `featurizer-core`.

mod hash_one_hot;
mod hashing;
mod l1_normalize;
mod missing_dummies;
mod standard_scaler;

pub use hash_one_hot::{
    hash_one_hot_vectorizer_estimator, HashOneHotEncoding, HashOneHotVectorizerEstimator,
    HashOneHotVectorizerTransformer, HASH_ONE_HOT_VECTORIZER,
};
pub use hashing::{murmur3_x86_32, stable_hash};
pub use l1_normalize::{
    l1_norm, l1_normalize_estimator, L1NormalizeEstimator, L1NormalizeTransformer, L1_NORMALIZE,
};
pub use missing_dummies::{
    missing_dummies_estimator, MissingDummiesEstimator, MissingDummiesTransformer, MISSING_DUMMIES,
};
pub use standard_scaler::{
    standard_scaler_estimator, ScalingStatistics, StandardScalerAccumulator,
    StandardScalerEstimator, StandardScalerTransformer, STANDARD_SCALER,
};

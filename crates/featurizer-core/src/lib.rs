//! Featurizer Core
//!
//! Generic training/inference protocol shared by every featurizer: the
//! training state machine, the estimator and transformer contracts, the
//! annotation store estimators use to share statistics, and the error
//! taxonomy reported across the foreign boundary.

mod accumulator;
mod annotation;
mod config;
mod element;
mod error;
mod estimator;
mod state;
mod transformer;

pub use accumulator::{Accumulator, InferenceOnly};
pub use annotation::{AnnotationStore, TrainingContext};
pub use crate::config::TrainingConfig;
pub use element::{HashBytes, Nullable, Numeric};
pub use error::{ErrorKind, FeaturizerError};
pub use estimator::Estimator;
pub use state::{FitResult, TrainingState};
pub use transformer::Transformer;

pub use byte_archive::{ArchiveBuffer, ArchiveFormat, ArchiveReader, ArchiveWriter};

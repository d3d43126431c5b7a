//! Training configuration

use crate::FeaturizerError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Limits applied to every estimator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Upper bound on passes over the dataset
    pub max_passes: u32,

    /// Items consumed per pass before the pass is treated as exhausted
    pub max_training_items: Option<u64>,

    /// Column slots in annotation stores created from this config
    pub annotation_columns: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_passes: 16,
            max_training_items: None,
            annotation_columns: 1,
        }
    }
}

impl TrainingConfig {
    /// Load from `featurizer.toml` and `FEATURIZER_*` environment variables
    pub fn load() -> Result<Self, FeaturizerError> {
        Self::load_from("featurizer")
    }

    /// Load from the named config file (extension optional) and the environment
    pub fn load_from(file: &str) -> Result<Self, FeaturizerError> {
        let config_result = ::config::Config::builder()
            .add_source(::config::File::with_name(file).required(false))
            .add_source(::config::Environment::with_prefix("FEATURIZER"))
            .build();

        let config: Self = match config_result {
            Ok(cfg) => cfg.try_deserialize().map_err(|e| {
                FeaturizerError::InvalidArgument(format!("Failed to deserialize config: {}", e))
            })?,
            Err(e) => {
                warn!("Training config could not be built ({}), using defaults", e);
                Self::default()
            }
        };

        config.validate()?;
        info!(
            "Training config: max_passes={}, max_training_items={:?}",
            config.max_passes, config.max_training_items
        );
        Ok(config)
    }

    /// Reject limits that would make training impossible
    pub fn validate(&self) -> Result<(), FeaturizerError> {
        if self.max_passes == 0 {
            return Err(FeaturizerError::invalid_argument("max_passes must be at least 1"));
        }
        if self.max_training_items == Some(0) {
            return Err(FeaturizerError::invalid_argument(
                "max_training_items must be at least 1 when set",
            ));
        }
        if self.annotation_columns == 0 {
            return Err(FeaturizerError::invalid_argument(
                "annotation_columns must be at least 1",
            ));
        }
        Ok(())
    }

    /// Config with a per-pass item budget
    pub fn with_max_training_items(self, max_training_items: u64) -> Self {
        Self {
            max_training_items: Some(max_training_items),
            ..self
        }
    }

    /// Config with a different pass bound
    pub fn with_max_passes(self, max_passes: u32) -> Self {
        Self { max_passes, ..self }
    }
}

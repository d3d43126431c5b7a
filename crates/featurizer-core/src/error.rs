//! Featurizer Error Types

use crate::TrainingState;
use byte_archive::ArchiveError;
use thiserror::Error;

/// Coarse error category reported across the foreign boundary
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument = 1,
    InvalidState = 2,
    HandleNotFound = 3,
    Deserialization = 4,
    InternalFault = 5,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidState => "InvalidState",
            Self::HandleNotFound => "HandleNotFound",
            Self::Deserialization => "Deserialization",
            Self::InternalFault => "InternalFault",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by estimators, transformers and the annotation store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeaturizerError {
    /// Null, empty or out-of-range input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted outside its required training state
    #[error("Invalid state: '{operation}' is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: TrainingState,
    },

    /// Stale or unknown handle
    #[error("Handle {0} not found")]
    HandleNotFound(u64),

    /// Saved data could not be read back
    #[error("Deserialization failed at offset {offset}: {reason}")]
    Deserialization { offset: usize, reason: String },

    /// A multi-pass accumulator asked for more passes than allowed
    #[error("Training requested more than {limit} passes")]
    PassLimitExceeded { limit: u32 },

    /// Unexpected condition
    #[error("Internal fault: {0}")]
    Internal(String),
}

impl FeaturizerError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidState { .. } | Self::PassLimitExceeded { .. } => ErrorKind::InvalidState,
            Self::HandleNotFound(_) => ErrorKind::HandleNotFound,
            Self::Deserialization { .. } => ErrorKind::Deserialization,
            Self::Internal(_) => ErrorKind::InternalFault,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<ArchiveError> for FeaturizerError {
    fn from(err: ArchiveError) -> Self {
        match err.offset() {
            Some(offset) => FeaturizerError::Deserialization {
                offset,
                reason: err.to_string(),
            },
            None => FeaturizerError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_limit_is_a_state_error() {
        let err = FeaturizerError::PassLimitExceeded { limit: 3 };
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_archive_read_errors_keep_offset() {
        let err: FeaturizerError = ArchiveError::Truncated {
            offset: 6,
            needed: 4,
            remaining: 1,
        }
        .into();
        assert!(matches!(err, FeaturizerError::Deserialization { offset: 6, .. }));
        assert_eq!(err.kind(), ErrorKind::Deserialization);
    }

    #[test]
    fn test_archive_write_errors_are_internal() {
        let err: FeaturizerError = ArchiveError::LengthOverflow(usize::MAX).into();
        assert_eq!(err.kind(), ErrorKind::InternalFault);
    }

    #[test]
    fn test_kind_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidArgument as u8, 1);
        assert_eq!(ErrorKind::InternalFault as u8, 5);
        assert_eq!(ErrorKind::HandleNotFound.to_string(), "HandleNotFound");
    }
}

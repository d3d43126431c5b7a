//! Archive Error Types

use crate::ArchiveVersion;
use thiserror::Error;

/// Errors raised while reading or writing an archive
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArchiveError {
    /// A read would run past the end of the buffer
    #[error("Archive truncated at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// The header names a different transformer layout
    #[error("Archive format id {found:#06x} at offset {offset} does not match expected {expected:#06x}")]
    FormatMismatch {
        offset: usize,
        expected: u16,
        found: u16,
    },

    /// The header version is not one the reader understands
    #[error("Unsupported archive version {found} at offset {offset}")]
    UnsupportedVersion {
        offset: usize,
        found: ArchiveVersion,
    },

    /// Bytes were present but did not decode to a valid value
    #[error("Invalid archive data at offset {offset}: {reason}")]
    InvalidData { offset: usize, reason: String },

    /// The reader finished with unread bytes left over
    #[error("Archive has {remaining} unread bytes at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },

    /// A value was too large to be length-prefixed
    #[error("Length {0} exceeds the u32 length prefix")]
    LengthOverflow(usize),

    /// A nested record could not be encoded
    #[error("Record encoding failed: {0}")]
    Encoding(String),
}

impl ArchiveError {
    /// Byte offset at which a read failed, if this is a read error
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Truncated { offset, .. }
            | Self::FormatMismatch { offset, .. }
            | Self::UnsupportedVersion { offset, .. }
            | Self::InvalidData { offset, .. }
            | Self::TrailingBytes { offset, .. } => Some(*offset),
            Self::LengthOverflow(_) | Self::Encoding(_) => None,
        }
    }
}

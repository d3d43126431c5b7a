//! Binary Archive
//!
//! Append-only writer and cursor-based reader used to persist trained
//! transformer state. All fixed-width values are little-endian; strings,
//! byte spans and vectors carry a `u32` length prefix. Every buffer starts
//! with an [`ArchiveFormat`] header naming the featurizer shape and version.

mod error;
mod persist;
mod reader;
mod writer;

pub use error::ArchiveError;
pub use persist::Persist;
pub use reader::ArchiveReader;
pub use writer::{ArchiveBuffer, ArchiveWriter};

/// Size in bytes of the format header at the start of every archive
pub const HEADER_SIZE: usize = 6;

/// Version of a persisted layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveVersion {
    pub major: u16,
    pub minor: u16,
}

impl ArchiveVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl std::fmt::Display for ArchiveVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Shape tag written at the start of every archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveFormat {
    /// Identifies which transformer layout follows
    pub id: u16,
    /// Layout version of that transformer
    pub version: ArchiveVersion,
}

impl ArchiveFormat {
    pub const fn new(id: u16, major: u16, minor: u16) -> Self {
        Self {
            id,
            version: ArchiveVersion::new(major, minor),
        }
    }
}

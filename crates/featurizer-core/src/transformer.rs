//! Transformer Contract

use crate::FeaturizerError;
use byte_archive::{ArchiveBuffer, ArchiveFormat, ArchiveReader, ArchiveWriter};
use tracing::info;

/// Trained, serializable inference object
///
/// Parameters are fixed once the transformer exists. `execute` takes `&mut
/// self` only so order-dependent transforms can buffer output for `flush`.
///
/// Saved data starts with [`Transformer::FORMAT`]; [`Transformer::save_fields`]
/// and [`Transformer::load_fields`] handle everything after the header.
pub trait Transformer: Sized + Send {
    type Input: ?Sized;
    type Output;

    /// Header identifying this transformer's persisted layout
    const FORMAT: ArchiveFormat;

    fn execute(&mut self, input: &Self::Input) -> Result<Self::Output, FeaturizerError>;

    /// Emit and clear buffered output
    fn flush(&mut self) -> Result<Vec<Self::Output>, FeaturizerError> {
        Ok(Vec::new())
    }

    fn save_fields(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError>;

    fn load_fields(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError>;

    /// Write the header followed by every parameter
    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        writer.write_format(Self::FORMAT);
        self.save_fields(writer)
    }

    /// Read the header, then the fields its version declares
    fn load(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        reader.expect_format(Self::FORMAT)?;
        Self::load_fields(reader)
    }

    /// Serialize into a standalone buffer
    fn to_bytes(&self) -> Result<ArchiveBuffer, FeaturizerError> {
        let mut writer = ArchiveWriter::new();
        self.save(&mut writer)?;
        Ok(writer.commit())
    }

    /// Reconstruct from a buffer produced by [`Transformer::to_bytes`]
    ///
    /// The whole buffer must be consumed.
    fn from_bytes(bytes: &[u8]) -> Result<Self, FeaturizerError> {
        if bytes.is_empty() {
            return Err(FeaturizerError::invalid_argument("saved data is empty"));
        }
        let mut reader = ArchiveReader::new(bytes);
        let transformer = Self::load(&mut reader)?;
        reader.finish()?;

        info!(
            "Reconstructed transformer format {:#06x} v{} from {} bytes",
            Self::FORMAT.id,
            Self::FORMAT.version,
            bytes.len()
        );
        Ok(transformer)
    }
}

//! Archive Reader

use crate::{ArchiveError, ArchiveFormat, ArchiveVersion, Persist};
use serde::de::DeserializeOwned;

/// Cursor over an immutable archive buffer
///
/// Every read checks the remaining length first; a short buffer yields
/// [`ArchiveError::Truncated`] with the offset of the failed read.
#[derive(Debug, Clone)]
pub struct ArchiveReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

macro_rules! read_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty, ArchiveError> {
                let raw = self.take(std::mem::size_of::<$ty>())?;
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                bytes.copy_from_slice(raw);
                Ok(<$ty>::from_le_bytes(bytes))
            }
        )*
    };
}

impl<'a> ArchiveReader<'a> {
    /// Create a reader positioned at the start of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Current read position
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Check if every byte has been consumed
    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Read the header and check it names `expected`
    ///
    /// The id is checked before the version so a buffer saved by another
    /// transformer is reported as a format mismatch.
    pub fn expect_format(&mut self, expected: ArchiveFormat) -> Result<(), ArchiveError> {
        let version = self.read_format(expected.id)?;
        if version != expected.version {
            return Err(ArchiveError::UnsupportedVersion {
                offset: self.offset - 4,
                found: version,
            });
        }
        Ok(())
    }

    /// Read the header, check its id, and return the stored version
    pub fn read_format(&mut self, expected_id: u16) -> Result<ArchiveVersion, ArchiveError> {
        let start = self.offset;
        let id = self.read_u16()?;
        if id != expected_id {
            return Err(ArchiveError::FormatMismatch {
                offset: start,
                expected: expected_id,
                found: id,
            });
        }
        let major = self.read_u16()?;
        let minor = self.read_u16()?;
        Ok(ArchiveVersion::new(major, minor))
    }

    read_le! {
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_i8 => i8,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    }

    pub fn read_u8(&mut self) -> Result<u8, ArchiveError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, ArchiveError> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ArchiveError::InvalidData {
                offset,
                reason: format!("bool byte must be 0 or 1, got {}", other),
            }),
        }
    }

    /// Read a `u32` length prefix
    pub fn read_len(&mut self) -> Result<usize, ArchiveError> {
        Ok(self.read_u32()? as usize)
    }

    /// Read a length-prefixed byte span without copying
    pub fn read_bytes(&mut self) -> Result<&'a [u8], ArchiveError> {
        let len = self.read_len()?;
        self.take(len)
    }

    /// Read length-prefixed UTF-8 text
    pub fn read_string(&mut self) -> Result<String, ArchiveError> {
        let start = self.offset;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| ArchiveError::InvalidData {
                offset: start,
                reason: e.to_string(),
            })
    }

    /// Read any value with a [`Persist`] encoding
    pub fn read<T: Persist>(&mut self) -> Result<T, ArchiveError> {
        T::restore(self)
    }

    /// Read a nested `serde` record written by `ArchiveWriter::write_record`
    pub fn read_record<T: DeserializeOwned>(&mut self) -> Result<T, ArchiveError> {
        let start = self.offset;
        let payload = self.read_bytes()?;
        let invalid = |reason: String| ArchiveError::InvalidData {
            offset: start,
            reason,
        };
        let (record, rest) = postcard::take_from_bytes(payload).map_err(|e| invalid(e.to_string()))?;
        if !rest.is_empty() {
            return Err(invalid(format!("{} unread bytes in record", rest.len())));
        }
        Ok(record)
    }

    /// Consume the reader, failing if any bytes are left
    pub fn finish(self) -> Result<(), ArchiveError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(ArchiveError::TrailingBytes {
                offset: self.offset,
                remaining: self.remaining(),
            })
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ArchiveError> {
        if len > self.remaining() {
            return Err(ArchiveError::Truncated {
                offset: self.offset,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArchiveWriter;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Moments {
        count: u64,
        mean: f64,
    }

    #[test]
    fn test_read_back_mixed_values() {
        let mut writer = ArchiveWriter::new();
        writer
            .write_format(ArchiveFormat::new(7, 1, 0))
            .write_i64(-42)
            .write_f64(0.25)
            .write_bool(true);
        writer.write_str("column").unwrap();
        let buffer = writer.commit();

        let mut reader = ArchiveReader::new(&buffer);
        reader.expect_format(ArchiveFormat::new(7, 1, 0)).unwrap();
        assert_eq!(reader.read_i64().unwrap(), -42);
        assert_eq!(reader.read_f64().unwrap(), 0.25);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_string().unwrap(), "column");
        reader.finish().unwrap();
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let bytes = [1u8, 2, 3];
        let mut reader = ArchiveReader::new(&bytes);
        reader.read_u16().unwrap();

        let err = reader.read_u32().unwrap_err();
        assert_eq!(
            err,
            ArchiveError::Truncated {
                offset: 2,
                needed: 4,
                remaining: 1
            }
        );
        // A failed read does not move the cursor
        assert_eq!(reader.offset(), 2);
    }

    #[test]
    fn test_length_prefix_past_end_is_truncation() {
        let bytes = [10u8, 0, 0, 0, b'a'];
        let mut reader = ArchiveReader::new(&bytes);
        assert!(matches!(
            reader.read_bytes(),
            Err(ArchiveError::Truncated { offset: 4, needed: 10, .. })
        ));
    }

    #[test]
    fn test_format_id_mismatch() {
        let mut writer = ArchiveWriter::new();
        writer.write_format(ArchiveFormat::new(3, 1, 0));
        let buffer = writer.commit();

        let err = ArchiveReader::new(&buffer)
            .expect_format(ArchiveFormat::new(4, 1, 0))
            .unwrap_err();
        assert_eq!(
            err,
            ArchiveError::FormatMismatch {
                offset: 0,
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_unsupported_version_points_at_version_bytes() {
        let mut writer = ArchiveWriter::new();
        writer.write_format(ArchiveFormat::new(3, 2, 0));
        let buffer = writer.commit();

        let err = ArchiveReader::new(&buffer)
            .expect_format(ArchiveFormat::new(3, 1, 0))
            .unwrap_err();
        assert_eq!(err.offset(), Some(2));
        assert!(matches!(err, ArchiveError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_invalid_bool() {
        let bytes = [2u8];
        let err = ArchiveReader::new(&bytes).read_bool().unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidData { offset: 0, .. }));
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [2u8, 0, 0, 0, 0xC3, 0x28];
        let err = ArchiveReader::new(&bytes).read_string().unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidData { offset: 0, .. }));
    }

    #[test]
    fn test_trailing_bytes() {
        let bytes = [1u8, 0, 0xAA];
        let mut reader = ArchiveReader::new(&bytes);
        reader.read_u16().unwrap();
        assert_eq!(
            reader.finish().unwrap_err(),
            ArchiveError::TrailingBytes {
                offset: 2,
                remaining: 1
            }
        );
    }

    #[test]
    fn test_nested_record() {
        let moments = Moments {
            count: 12,
            mean: 3.5,
        };
        let mut writer = ArchiveWriter::new();
        writer.write_record(&moments).unwrap();
        writer.write_u8(9);
        let buffer = writer.commit();

        let mut reader = ArchiveReader::new(&buffer);
        assert_eq!(reader.read_record::<Moments>().unwrap(), moments);
        assert_eq!(reader.read_u8().unwrap(), 9);
        reader.finish().unwrap();
    }

    proptest! {
        #[test]
        fn prop_reader_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut reader = ArchiveReader::new(&bytes);
            let _ = reader.expect_format(ArchiveFormat::new(1, 1, 0));
            let _ = reader.read_string();
            let _ = reader.read::<Vec<f64>>();
            let _ = reader.read_record::<Moments>();
            prop_assert!(reader.offset() <= bytes.len());
        }

        #[test]
        fn prop_cut_buffer_is_always_truncated(values in proptest::collection::vec(any::<i32>(), 1..16), cut in 1usize..8) {
            let mut writer = ArchiveWriter::new();
            writer.write(&values).unwrap();
            let buffer = writer.commit();
            let cut = cut.min(buffer.len());

            let err = ArchiveReader::new(&buffer[..buffer.len() - cut]).read::<Vec<i32>>().unwrap_err();
            let is_truncated = matches!(err, ArchiveError::Truncated { .. });
            prop_assert!(is_truncated);
        }
    }
}

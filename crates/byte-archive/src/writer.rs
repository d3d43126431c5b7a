//! Archive Writer

use crate::{ArchiveError, ArchiveFormat, Persist};
use serde::Serialize;
use std::ops::Deref;

/// Immutable byte sequence produced by [`ArchiveWriter::commit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBuffer(Box<[u8]>);

impl ArchiveBuffer {
    /// Number of bytes in the buffer
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hand the single allocation backing this buffer to the caller
    pub fn into_boxed_slice(self) -> Box<[u8]> {
        self.0
    }
}

impl Deref for ArchiveBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for ArchiveBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Append-only serializer
///
/// Records are written as a sequence of primitive and nested writes with no
/// terminator; the reader must know the shape from the format header.
#[derive(Debug, Default)]
pub struct ArchiveWriter {
    buffer: Vec<u8>,
}

impl ArchiveWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with pre-reserved space
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Write the shape/version header
    pub fn write_format(&mut self, format: ArchiveFormat) -> &mut Self {
        self.write_u16(format.id)
            .write_u16(format.version.major)
            .write_u16(format.version.minor)
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_i8(&mut self, value: i8) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        self.write_raw(&value.to_le_bytes())
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    /// Write a `u32` length prefix followed by the bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, ArchiveError> {
        self.write_len(bytes.len())?;
        Ok(self.write_raw(bytes))
    }

    /// Write UTF-8 text as a length-prefixed byte span
    pub fn write_str(&mut self, value: &str) -> Result<&mut Self, ArchiveError> {
        self.write_bytes(value.as_bytes())
    }

    /// Write a `u32` element count or byte length
    pub fn write_len(&mut self, len: usize) -> Result<&mut Self, ArchiveError> {
        let len = u32::try_from(len).map_err(|_| ArchiveError::LengthOverflow(len))?;
        Ok(self.write_u32(len))
    }

    /// Write any value with a [`Persist`] encoding
    pub fn write<T: Persist>(&mut self, value: &T) -> Result<&mut Self, ArchiveError> {
        value.persist(self)?;
        Ok(self)
    }

    /// Write a nested `serde` record as a length-prefixed postcard payload
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<&mut Self, ArchiveError> {
        let payload =
            postcard::to_allocvec(record).map_err(|e| ArchiveError::Encoding(e.to_string()))?;
        self.write_bytes(&payload)
    }

    /// Finalize into an immutable buffer
    pub fn commit(self) -> ArchiveBuffer {
        ArchiveBuffer(self.buffer.into_boxed_slice())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }
}

//! Value Encodings

use crate::{ArchiveError, ArchiveReader, ArchiveWriter};

/// A value with a fixed archive encoding
pub trait Persist {
    fn persist(&self, writer: &mut ArchiveWriter) -> Result<(), ArchiveError>;

    fn restore(reader: &mut ArchiveReader<'_>) -> Result<Self, ArchiveError>
    where
        Self: Sized;
}

macro_rules! persist_primitive {
    ($($ty:ty => $write:ident, $read:ident);* $(;)?) => {
        $(
            impl Persist for $ty {
                fn persist(&self, writer: &mut ArchiveWriter) -> Result<(), ArchiveError> {
                    writer.$write(*self);
                    Ok(())
                }

                fn restore(reader: &mut ArchiveReader<'_>) -> Result<Self, ArchiveError> {
                    reader.$read()
                }
            }
        )*
    };
}

persist_primitive! {
    u8 => write_u8, read_u8;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    i8 => write_i8, read_i8;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
    bool => write_bool, read_bool;
}

impl Persist for String {
    fn persist(&self, writer: &mut ArchiveWriter) -> Result<(), ArchiveError> {
        writer.write_str(self).map(drop)
    }

    fn restore(reader: &mut ArchiveReader<'_>) -> Result<Self, ArchiveError> {
        reader.read_string()
    }
}

impl<T: Persist> Persist for Vec<T> {
    fn persist(&self, writer: &mut ArchiveWriter) -> Result<(), ArchiveError> {
        writer.write_len(self.len())?;
        for item in self {
            item.persist(writer)?;
        }
        Ok(())
    }

    fn restore(reader: &mut ArchiveReader<'_>) -> Result<Self, ArchiveError> {
        let len = reader.read_len()?;
        // Every element takes at least one byte, so a count larger than the
        // remaining bytes can be rejected before allocating.
        if len > reader.remaining() {
            return Err(ArchiveError::Truncated {
                offset: reader.offset(),
                needed: len,
                remaining: reader.remaining(),
            });
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::restore(reader)?);
        }
        Ok(items)
    }
}

impl<T: Persist> Persist for Option<T> {
    fn persist(&self, writer: &mut ArchiveWriter) -> Result<(), ArchiveError> {
        match self {
            Some(value) => {
                writer.write_bool(true);
                value.persist(writer)
            }
            None => {
                writer.write_bool(false);
                Ok(())
            }
        }
    }

    fn restore(reader: &mut ArchiveReader<'_>) -> Result<Self, ArchiveError> {
        if reader.read_bool()? {
            Ok(Some(T::restore(reader)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_layout() {
        let mut writer = ArchiveWriter::new();
        writer.write(&vec![1u16, 2u16]).unwrap();
        assert_eq!(&writer.commit()[..], &[2, 0, 0, 0, 1, 0, 2, 0]);
    }

    #[test]
    fn test_nested_vectors_and_options() {
        let value: Vec<Option<String>> = vec![Some("a".into()), None, Some(String::new())];
        let mut writer = ArchiveWriter::new();
        writer.write(&value).unwrap();
        let buffer = writer.commit();

        let mut reader = ArchiveReader::new(&buffer);
        assert_eq!(reader.read::<Vec<Option<String>>>().unwrap(), value);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_oversized_count_rejected_before_allocating() {
        let bytes = [0xFF, 0xFF, 0xFF, 0x7F, 1];
        let err = ArchiveReader::new(&bytes).read::<Vec<u8>>().unwrap_err();
        assert!(matches!(err, ArchiveError::Truncated { offset: 4, .. }));
    }
}

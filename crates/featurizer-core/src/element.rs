//! Element Capability Traits
//!
//! Small traits that let one generic featurizer cover every numeric and text
//! element type instead of one implementation per type.

/// Values with a stable byte representation for hashing
///
/// Fixed-width values hash their little-endian bytes; text hashes its UTF-8
/// bytes without a length prefix.
pub trait HashBytes {
    fn with_hash_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;
}

macro_rules! hash_bytes_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HashBytes for $ty {
                fn with_hash_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
                    f(&self.to_le_bytes())
                }
            }
        )*
    };
}

hash_bytes_le!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl HashBytes for bool {
    fn with_hash_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&[u8::from(*self)])
    }
}

impl HashBytes for str {
    fn with_hash_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_bytes())
    }
}

impl HashBytes for String {
    fn with_hash_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(self.as_bytes())
    }
}

/// Values with a null sentinel
pub trait Nullable {
    fn is_null(&self) -> bool;
}

impl Nullable for f32 {
    fn is_null(&self) -> bool {
        self.is_nan()
    }
}

impl Nullable for f64 {
    fn is_null(&self) -> bool {
        self.is_nan()
    }
}

impl<T> Nullable for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

/// Numeric values that can be widened to `f64`
pub trait Numeric: Copy {
    fn to_f64(self) -> f64;
}

macro_rules! numeric_as_f64 {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Numeric for $ty {
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

numeric_as_f64!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes_are_little_endian() {
        0x0102_i16.with_hash_bytes(|bytes| assert_eq!(bytes, &[0x02, 0x01]));
        "hi".with_hash_bytes(|bytes| assert_eq!(bytes, b"hi"));
        true.with_hash_bytes(|bytes| assert_eq!(bytes, &[1]));
    }

    #[test]
    fn test_null_sentinels() {
        assert!(f64::NAN.is_null());
        assert!(!0.0f32.is_null());
        assert!(None::<i32>.is_null());
        assert!(!Some(0u8).is_null());
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!((-3i8).to_f64(), -3.0);
        assert_eq!(2.5f32.to_f64(), 2.5);
    }
}

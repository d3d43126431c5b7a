//! Stable Hashing
//!
//! MurmurHash3 x86 32-bit. Output depends only on the input bytes and the
//! seed, so saved transformers hash identically on every platform.

use featurizer_core::HashBytes;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// MurmurHash3 x86 32-bit over `data`
pub fn murmur3_x86_32(data: &[u8], seed: u32) -> u32 {
    let mut hash = seed;

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        hash ^= mix_k(k);
        hash = hash.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let k = tail
            .iter()
            .enumerate()
            .fold(0u32, |k, (i, &byte)| k | (u32::from(byte) << (8 * i)));
        hash ^= mix_k(k);
    }

    // Length is mixed in modulo 2^32
    hash ^= data.len() as u32;
    fmix32(hash)
}

/// Hash a value's stable byte representation
pub fn stable_hash<T: HashBytes + ?Sized>(value: &T, seed: u32) -> u32 {
    value.with_hash_bytes(|bytes| murmur3_x86_32(bytes, seed))
}

#[inline]
fn mix_k(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vectors() {
        assert_eq!(murmur3_x86_32(b"", 0), 0);
        assert_eq!(murmur3_x86_32(b"", 1), 0x514e_28b7);
        assert_eq!(murmur3_x86_32(b"hello", 0), 613_153_351);
        assert_eq!(
            murmur3_x86_32(b"The quick brown fox jumps over the lazy dog", 0),
            0x2e4f_f723
        );
    }

    #[test]
    fn test_tail_lengths() {
        assert_eq!(murmur3_x86_32(b"abc", 0), 3_017_643_002);
        assert_eq!(murmur3_x86_32(b"abcd", 0), 1_139_631_978);
    }

    #[test]
    fn test_stable_hash_uses_value_bytes() {
        assert_eq!(stable_hash(&15i8, 2) % 100, 29);
        assert_eq!(stable_hash("hello", 2) % 100, 25);
        assert_eq!(stable_hash(&String::from("hello"), 2), stable_hash("hello", 2));
    }
}

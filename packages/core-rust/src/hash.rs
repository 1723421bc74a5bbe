//! FNV-1a string hash for the color fallback path.
//!
//! Hashes UTF-16 code units so the result matches a browser computing
//! `charCodeAt()`-based FNV-1a over the same string. Stable across runs and
//! platforms, which is all the fallback needs.

/// FNV-1a offset basis (32-bit).
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1a prime (32-bit).
const FNV_PRIME: u32 = 0x0100_0193;

/// Computes a 32-bit FNV-1a hash of a string over its UTF-16 code units.
///
/// # Examples
///
/// ```
/// use geometa_core::hash::fnv1a_hash;
///
/// assert_eq!(fnv1a_hash("hello"), 1_335_831_723);
/// assert_eq!(fnv1a_hash(""), 2_166_136_261);
/// ```
#[must_use]
pub fn fnv1a_hash(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for code_unit in s.encode_utf16() {
        hash ^= u32::from(code_unit);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Maps a string onto `0..buckets` via [`fnv1a_hash`]. `buckets` must be non-zero.
#[must_use]
pub fn hash_bucket(s: &str, buckets: usize) -> usize {
    // u32 always fits in usize on supported targets.
    fnv1a_hash(s) as usize % buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(fnv1a_hash("hello"), 1_335_831_723);
        assert_eq!(fnv1a_hash("key1"), 927_623_783);
        assert_eq!(fnv1a_hash(""), 2_166_136_261);
    }

    #[test]
    fn deterministic() {
        assert_eq!(fnv1a_hash("maintained"), fnv1a_hash("maintained"));
        assert_ne!(fnv1a_hash("left"), fnv1a_hash("right"));
    }

    #[test]
    fn bucket_in_range() {
        for word in ["left", "right", "N", "S", "E", "gray", ""] {
            assert!(hash_bucket(word, 10) < 10);
        }
        assert_eq!(hash_bucket("anything", 1), 0);
    }
}

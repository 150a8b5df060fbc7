//! Key → Shard Routing
//!
//! Keys are spread over the shards with a 32-bit FNV-1 hash. FNV is not
//! cryptographic, but it is fast, has good dispersion for short keys and,
//! unlike `DefaultHasher`, is stable across processes and Rust releases, so
//! a key always lands in the same shard for a given shard count.

/// FNV-1 32-bit offset basis.
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1 32-bit prime.
const FNV_PRIME: u32 = 0x0100_0193;

/// Computes the 32-bit FNV-1 hash of `key`.
#[inline]
pub fn hash32(key: &[u8]) -> u32 {
    key.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        hash.wrapping_mul(FNV_PRIME) ^ u32::from(byte)
    })
}

/// Maps `key` to a shard index in `0..shards`.
///
/// `shards` must be non-zero.
#[inline]
pub fn shard_index(key: &[u8], shards: usize) -> usize {
    debug_assert!(shards > 0, "shard count must be non-zero");
    hash32(key) as usize % shards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash32_known_vectors() {
        assert_eq!(hash32(b""), 0x811c_9dc5);
        assert_eq!(hash32(b"a"), 0x050c_5d7e);
        assert_eq!(hash32(b"foo"), 0x408f_5e13);
        assert_eq!(hash32(b"foobar"), 0x31f0_b262);
    }

    #[test]
    fn test_shard_index_is_deterministic() {
        assert_eq!(shard_index(b"foo", 1024), 531);
        assert_eq!(shard_index(b"foo", 1024), shard_index(b"foo", 1024));
        assert_eq!(shard_index(b"foobar", 1024), 610);
    }

    #[test]
    fn test_shard_index_in_range() {
        for shards in [1, 2, 7, 64, 1024] {
            for i in 0..500 {
                let key = format!("key:{}", i);
                assert!(shard_index(key.as_bytes(), shards) < shards);
            }
        }
    }

    #[test]
    fn test_single_shard() {
        assert_eq!(shard_index(b"anything", 1), 0);
        assert_eq!(shard_index(b"", 1), 0);
    }
}

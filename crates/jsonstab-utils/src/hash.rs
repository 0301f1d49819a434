//! Content hashing for per-path idempotent emission.
//!
//! The differ needs a cheap, stable fingerprint of a value's canonical
//! serialization to decide whether a candidate edit is novel. We use BLAKE3
//! and fold it down to 64 bits rather than compare full 32-byte digests,
//! since path records are kept in memory for the life of a session.

/// Hash arbitrary canonical bytes down to a 64-bit fingerprint.
///
/// Collisions are possible but the birthday bound at session-local scale
/// (thousands of paths, not billions) makes this an acceptable tradeoff
/// against carrying a full digest per path record.
#[must_use]
pub fn content_hash_u64(canonical_bytes: &[u8]) -> u64 {
    let digest = blake3::hash(canonical_bytes);
    let bytes = digest.as_bytes();
    u64::from_le_bytes(bytes[..8].try_into().expect("blake3 digest is 32 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_same_hash() {
        assert_eq!(content_hash_u64(b"hello"), content_hash_u64(b"hello"));
    }

    #[test]
    fn different_bytes_different_hash() {
        assert_ne!(content_hash_u64(b"hello"), content_hash_u64(b"world"));
    }

    #[test]
    fn empty_input_is_stable() {
        assert_eq!(content_hash_u64(b""), content_hash_u64(b""));
    }
}

use std::num::NonZeroU64;

use sha2::{
    Digest,
    Sha256,
};

/// A location on the ring. Both node identifiers and keys are hashed into
/// the same keyspace.
pub type Position = u64;

/// Default size of the keyspace: every position lies in `[0, 2^30)`.
pub const SEARCH_SPACE: u64 = 1 << 30;

const DEFAULT_SEARCH_SPACE: NonZeroU64 = NonZeroU64::new(SEARCH_SPACE).unwrap();

/// Maps a string to a position on the ring.
///
/// The ring only needs a deterministic mapping; implementations other than
/// [`Sha256Position`] are mostly useful to pin keys at known positions.
pub trait PositionHasher {
    fn position(&self, key: &str) -> Position;
}

/// SHA-256 of the UTF-8 key, read as a big-endian unsigned integer and
/// reduced modulo the search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Position {
    search_space: NonZeroU64,
}

impl Sha256Position {
    pub fn new(search_space: NonZeroU64) -> Self {
        Self { search_space }
    }

    pub fn search_space(&self) -> u64 {
        self.search_space.get()
    }
}

impl Default for Sha256Position {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_SPACE)
    }
}

impl PositionHasher for Sha256Position {
    fn position(&self, key: &str) -> Position {
        let digest = Sha256::digest(key.as_bytes());
        let modulus = u128::from(self.search_space.get());

        // Horner reduction keeps the remainder below 2^64, so the shift never
        // overflows u128.
        let remainder = digest
            .iter()
            .fold(0u128, |acc, &byte| ((acc << 8) | u128::from(byte)) % modulus);

        remainder as Position
    }
}

/// Position of `key` in the default keyspace.
pub fn hash_position(key: &str) -> Position {
    Sha256Position::default().position(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        assert_eq!(hash_position("node-a"), hash_position("node-a"));
        assert_eq!(hash_position(""), hash_position(""));
    }

    #[test]
    fn test_within_search_space() {
        for key in ["", "a", "node-1", "user:42", "ключ", "🦀"] {
            assert!(hash_position(key) < SEARCH_SPACE);
        }
    }

    #[test]
    fn test_default_matches_low_bits_of_digest() {
        // 2^30 divides 2^256, so the reduction keeps the low 30 bits of the
        // big-endian digest.
        for key in ["alpha", "beta", "gamma", ""] {
            let digest = Sha256::digest(key.as_bytes());
            let tail = u32::from_be_bytes([digest[28], digest[29], digest[30], digest[31]]);
            let expected = u64::from(tail) & (SEARCH_SPACE - 1);
            assert_eq!(hash_position(key), expected);
        }
    }

    #[test]
    fn test_known_positions() {
        // int(sha256(key).hexdigest(), 16) % 2**30
        assert_eq!(hash_position("alpha"), 253895672);
        assert_eq!(hash_position(""), 944945237);
        assert_eq!(hash_position("ключ"), 350992574);

        let hasher = Sha256Position::new(NonZeroU64::new(97).unwrap());
        assert_eq!(hasher.position("alpha"), 18);
    }

    #[test]
    fn test_custom_search_space() {
        let hasher = Sha256Position::new(NonZeroU64::new(97).unwrap());
        assert_eq!(hasher.search_space(), 97);
        for i in 0..200 {
            assert!(hasher.position(&format!("key-{i}")) < 97);
        }
    }

    #[test]
    fn test_search_space_of_one() {
        let hasher = Sha256Position::new(NonZeroU64::MIN);
        assert_eq!(hasher.position("anything"), 0);
    }

    #[test]
    fn test_default_search_space() {
        assert_eq!(Sha256Position::default().search_space(), SEARCH_SPACE);
    }
}

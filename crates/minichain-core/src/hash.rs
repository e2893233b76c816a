//! SHA-256 block digests and their hex rendering.
//!
//! Difficulty is measured in leading `'0'` characters of the lowercase hex
//! digest, so one unit of difficulty is one zero nibble.

use crate::constants::{HASH_HEX_SIZE, HASH_SIZE};
use crate::error::HashParseError;
use sha2::{Digest, Sha256};

pub type Hash = [u8; HASH_SIZE];

pub fn digest(content: &[u8]) -> Hash {
    finalize(Sha256::new_with_prefix(content))
}

pub(crate) fn finalize(hasher: Sha256) -> Hash {
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

pub fn from_hex(s: &str) -> Result<Hash, HashParseError> {
    if s.len() != HASH_HEX_SIZE {
        return Err(HashParseError::Length(s.len()));
    }
    let mut out = [0u8; HASH_SIZE];
    hex::decode_to_slice(s, &mut out)?;
    Ok(out)
}

/// Number of leading `'0'` characters in the hex rendering of `hash`.
pub fn leading_zero_nibbles(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 2;
        } else {
            if *b < 0x10 {
                total += 1;
            }
            break;
        }
    }
    total
}

pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    leading_zero_nibbles(hash) >= difficulty
}

/// Serde adapter that writes a [`Hash`] as a lowercase hex string.
pub mod serde_hex {
    use super::{from_hex, to_hex, Hash};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        from_hex(&s).map_err(D::Error::custom)
    }
}

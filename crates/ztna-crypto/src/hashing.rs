//! Hashing utilities using BLAKE3.

use crate::constants::DOMAIN_FINGERPRINT;
use blake3::Hasher as Blake3Hasher;

/// Hash data using BLAKE3
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake3Hasher::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the one-way hardware fingerprint hash from raw identifiers.
///
/// Each identifier is length-prefixed (u32 big-endian) so that moving bytes
/// between adjacent identifiers changes the hash. The result is lowercase hex.
pub fn fingerprint_hash(identifiers: &[&str]) -> String {
    let mut hasher = Blake3Hasher::new();
    hasher.update(DOMAIN_FINGERPRINT.as_bytes());
    for identifier in identifiers {
        let bytes = identifier.as_bytes();
        hasher.update(&(bytes.len() as u32).to_be_bytes());
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize().as_bytes())
}

/// Short, non-reversible tag for a secret value, safe to put in logs.
pub fn hash_for_log(value: &str) -> String {
    let hash = blake3_hash(value.as_bytes());
    hex::encode(&hash[..8])
}

/// Securely compare two byte slices in constant time
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

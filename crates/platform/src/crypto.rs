//! Cryptographic Utilities

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 as a lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// SHA-256 truncated to the first `bytes` bytes, hex-encoded
///
/// Used for short list digests and vector digests where the full 32 bytes
/// would be wasted.
pub fn sha256_hex_truncated(data: &[u8], bytes: usize) -> String {
    let hash = sha256(data);
    hex::encode(&hash[..bytes.min(hash.len())])
}

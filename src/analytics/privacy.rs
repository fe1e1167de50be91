//! Client identifier hashing
//!
//! Scan events never store the raw client identifier; only this digest.

use sha2::{Digest, Sha256};

/// SHA-256 of the client identifier, rendered as lowercase hex.
/// Deterministic, so repeat visitors can still be grouped later without
/// the raw value ever being persisted.
pub fn hash_client_id(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

//! Content fingerprints
//!
//! SHA-256 digests rendered as lowercase hex. ConfigMap data is hashed in
//! ascending key order so the same content always yields the same value.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Fingerprint of ConfigMap data: SHA-256 over `key + value` of every entry.
pub fn config_fingerprint(data: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of the JSON encoding of `value`.
pub fn spec_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

//! Hashing - SHA-256 Fingerprints
//!
//! Two cart lines describe the same mattress iff their fingerprints match.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compact JSON with object keys in sorted order. Going through `Value`
/// sorts them, since `serde_json::Map` is a `BTreeMap`.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(&serde_json::to_value(value)?)
}

/// Fingerprint of a configured product
/// fingerprint = sha256(name + canonical_configuration)
pub fn configuration_fingerprint(
    name: &str,
    configuration: &impl Serialize,
) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(configuration)?;
    let combined = format!("{}:{}", name, canonical);
    Ok(sha256_hex(combined.as_bytes()))
}

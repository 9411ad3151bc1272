//! Content-addressed cache keys.
//!
//! The remote cache key is derived from a schema version plus the
//! normalized request, so identical requests always map to the same
//! object and any change to either input moves to a fresh key. Bump
//! the schema version whenever rendering output changes for the same
//! request.

use sha2::{Digest, Sha256};

use crate::compose::DiagramRequest;

/// Hex characters kept from the digest; storage-path-safe and short.
pub const KEY_LENGTH: usize = 20;

/// Derives the content hash for a request.
///
/// Deterministic: same version and request always produce the same
/// key. The request is normalized through its canonical JSON form
/// (struct field order is fixed).
pub fn derive_key(
    schema_version: u32,
    request: &DiagramRequest,
) -> Result<String, serde_json::Error> {
    let normalized = serde_json::to_string(request)?;
    let mut hasher = Sha256::new();
    hasher.update(schema_version.to_le_bytes());
    hasher.update(normalized.as_bytes());
    let mut key = hex::encode(hasher.finalize());
    key.truncate(KEY_LENGTH);
    Ok(key)
}

/// Full object path for the remote store: `{prefix}/{hash}.png`.
pub fn object_key(
    prefix: &str,
    schema_version: u32,
    request: &DiagramRequest,
) -> Result<String, serde_json::Error> {
    Ok(format!(
        "{}/{}.png",
        prefix.trim_end_matches('/'),
        derive_key(schema_version, request)?
    ))
}

//! Request identity hashing.
//!
//! A cached entry is keyed by the normalized request identity: method plus
//! canonical URL. Only GET requests ever reach the cache, but the method is
//! part of the key so a snapshot can never be served for the wrong verb.

use sha2::{Digest, Sha256};

/// Compute the entry key for a request identity.
pub fn entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

//! Stable row keys for request identities.

use sha2::{Digest, Sha256};

use crate::RequestIdentity;

/// Compute the row key for an identity within a store.
pub fn entry_key(identity: &RequestIdentity) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.method().as_bytes());
    hasher.update(b"\n");
    hasher.update(identity.url().as_str().as_bytes());
    hex::encode(hasher.finalize())
}

//! Content hashing and per-document duplicate tracking.
//!
//! Dedup is **content-addressed**: two images are duplicates when their raw
//! bytes hash to the same SHA-256 digest, regardless of where they sit in the
//! document or what format tag they carry.
//!
//! The accepted set is owned by a single document's extraction run. It is
//! never shared across documents, so documents can be processed in parallel
//! without synchronization.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// SHA-256 of a byte buffer, returned as a lowercase hex string.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}

/// Hashes of images already accepted within one document.
///
/// Only images that survive every filter are registered, so a filtered-out
/// image never shadows a later identical copy.
#[derive(Debug, Default)]
pub struct AcceptedHashes {
    enabled: bool,
    seen: HashSet<String>,
}

impl AcceptedHashes {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            seen: HashSet::new(),
        }
    }

    /// True if dedup is on and this content was already accepted.
    pub fn is_duplicate(&self, hash: &str) -> bool {
        self.enabled && self.seen.contains(hash)
    }

    /// Register an accepted image. No-op when dedup is disabled.
    pub fn accept(&mut self, hash: String) {
        if self.enabled {
            self.seen.insert(hash);
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

//! Hash functions for cell and address derivation

use sha2::{Digest, Sha256};

/// SHA-256 over several slices without concatenating them first
pub fn sha256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

//! SHA-256 helpers used to derive the relay's routing token from a public key.

use sha2::{Digest, Sha256};

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&out);
    buf
}

/// `token = SHA256(pub_key_bytes)`, the relay's only view of a recipient.
pub fn derive_token(pub_key_bytes: &[u8]) -> [u8; 32] {
    sha256(pub_key_bytes)
}

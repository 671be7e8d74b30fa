//! Long-term identity key pairs.
//!
//! An identity is a single X25519 key exchange pair. There is no signing
//! half: the relay never authenticates senders, so there is nothing for a
//! signature to protect at this layer (sender identity is a claim inside
//! the sealed plaintext, see `envelope`).

use rand_core::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// A long-term X25519 key pair. Private key material is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Identity {
    #[zeroize(skip)] // StaticSecret implements Zeroize internally
    kex_key: StaticSecret,
}

impl Identity {
    /// Generate a fresh identity using the OS random source.
    pub fn generate() -> Self {
        Self {
            kex_key: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// Reconstruct an identity from a raw 32-byte private key.
    pub fn from_bytes(priv_bytes: &[u8; 32]) -> Self {
        Self {
            kex_key: StaticSecret::from(*priv_bytes),
        }
    }

    /// Raw private key bytes.
    pub fn private_bytes(&self) -> [u8; 32] {
        self.kex_key.to_bytes()
    }

    /// Raw public key bytes.
    pub fn public_bytes(&self) -> [u8; 32] {
        *X25519PublicKey::from(&self.kex_key).as_bytes()
    }

    /// Canonical 64-char lowercase hex encoding of the public key.
    pub fn public_hex(&self) -> String {
        hex::encode(self.public_bytes())
    }

    pub(crate) fn kex_secret(&self) -> &StaticSecret {
        &self.kex_key
    }
}

/// Produce a fresh long-term key pair, per `generate_identity()` in the envelope contract.
pub fn generate_identity() -> Identity {
    Identity::generate()
}

/// Parse a 64-char lowercase hex public key into raw bytes. Matches
/// `^[0-9a-f]{64}$` exactly — uppercase hex digits are rejected, not
/// normalized, since the canonical form is lowercase.
pub fn parse_public_hex(s: &str) -> Result<[u8; 32], CryptoError> {
    if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return Err(CryptoError::InvalidKey("expected 64 lowercase hex characters"));
    }
    let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidKey("malformed hex"))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_valid_hex() {
        let id = Identity::generate();
        let hex_pub = id.public_hex();
        assert_eq!(hex_pub.len(), 64);
        assert!(parse_public_hex(&hex_pub).is_ok());
    }

    #[test]
    fn distinct_identities_have_distinct_keys() {
        let a = Identity::generate();
        let b = Identity::generate();
        assert_ne!(a.public_bytes(), b.public_bytes());
    }

    #[test]
    fn round_trip_through_bytes() {
        let a = Identity::generate();
        let priv_bytes = a.private_bytes();
        let b = Identity::from_bytes(&priv_bytes);
        assert_eq!(a.public_bytes(), b.public_bytes());
    }

    #[test]
    fn parse_public_hex_rejects_bad_length() {
        assert!(parse_public_hex("abcd").is_err());
    }

    #[test]
    fn parse_public_hex_rejects_uppercase() {
        let id = Identity::generate();
        let upper = id.public_hex().to_uppercase();
        assert!(parse_public_hex(&upper).is_err());
    }

    #[test]
    fn parse_public_hex_rejects_non_hex() {
        let bad = "g".repeat(64);
        assert!(parse_public_hex(&bad).is_err());
    }
}

//! Sealed-envelope encryption: X25519 ECDH + HKDF-SHA256 + XChaCha20Poly1305.
//!
//! The wire entity (`Envelope`) never carries the true sender's identity —
//! only an ephemeral public key the relay can route by but never learn
//! anything from. The true sender is a claim embedded *inside* the sealed
//! plaintext (see `INNER_SEP`), recoverable only by the recipient.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand_core::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey};

use crate::error::CryptoError;
use crate::hash::derive_token;
use crate::identity::{parse_public_hex, Identity};

/// Separator between the embedded sender public key and the message payload
/// in the sealed inner plaintext.
const INNER_SEP: u8 = b'|';

const DEFAULT_TTL_SECS: u32 = 3600;
const MIN_TTL_SECS: u32 = 60;
const MAX_TTL_SECS: u32 = 86_400;

/// Clamp a caller-supplied ttl into `[MIN_TTL_SECS, MAX_TTL_SECS]`.
pub fn clamp_ttl(ttl: u32) -> u32 {
    ttl.clamp(MIN_TTL_SECS, MAX_TTL_SECS)
}

/// The on-wire record carrying one sealed message from sender to relay to recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub token: String,
    pub ciphertext: String,
    pub nonce: String,
    pub sender_public_key: String,
    pub ttl: u32,
}

/// Who the recipient believes sent a decrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderClaim {
    /// The 64-hex prefix parsed cleanly; this is the claimed long-term public key.
    Known(String),
    /// The prefix was missing or malformed; the message is still delivered.
    Unknown,
}

/// An opened, decrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedMessage {
    pub sender: SenderClaim,
    pub plaintext: Vec<u8>,
}

fn kdf_key(shared_secret: &[u8; 32], salt: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(salt), shared_secret);
    let mut key = [0u8; 32];
    hk.expand(b"wisp_envelope_v1_key", &mut key)
        .expect("32-byte output is within HKDF-SHA256 limits");
    key
}

/// Seal `plaintext` to `recipient_pub` so only its holder can recover it,
/// embedding `self_pub` as the recoverable sender claim.
///
/// `ttl` is clamped to `[60, 86400]` seconds per the relay's retention policy.
pub fn seal(
    recipient_pub: &[u8; 32],
    self_pub: &[u8; 32],
    plaintext: &[u8],
    ttl: u32,
) -> Result<Envelope, CryptoError> {
    let recipient = X25519PublicKey::from(*recipient_pub);

    let mut inner = Vec::with_capacity(64 + 1 + plaintext.len());
    inner.extend_from_slice(hex::encode(self_pub).as_bytes());
    inner.push(INNER_SEP);
    inner.extend_from_slice(plaintext);

    let mut nonce_bytes = [0u8; 24];
    getrandom::getrandom(&mut nonce_bytes)
        .map_err(|_| CryptoError::InvalidKey("failed to draw random nonce"))?;

    // e_priv is used exactly once and zeroized by EphemeralSecret's Drop impl.
    let e_priv = EphemeralSecret::random_from_rng(OsRng);
    let e_pub = X25519PublicKey::from(&e_priv);
    let shared = e_priv.diffie_hellman(&recipient);

    let key = kdf_key(&shared.to_bytes(), &nonce_bytes);
    let cipher = XChaCha20Poly1305::new((&key).into());
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce_bytes),
            Payload {
                msg: &inner,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::InvalidKey("seal failed"))?;

    let token = hex::encode(derive_token(recipient_pub));

    Ok(Envelope {
        token,
        ciphertext: hex::encode(ciphertext),
        nonce: hex::encode(nonce_bytes),
        sender_public_key: hex::encode(e_pub.as_bytes()),
        ttl: clamp_ttl(ttl),
    })
}

/// Decrypt an envelope addressed to `self_identity`, recovering the embedded
/// sender claim and message payload.
///
/// Authentication-tag failure is the only hard error; a malformed sender
/// prefix is recoverable — the message is still returned, tagged `Unknown`.
pub fn open(self_identity: &Identity, envelope: &Envelope) -> Result<OpenedMessage, CryptoError> {
    let ciphertext = hex::decode(&envelope.ciphertext)
        .map_err(|_| CryptoError::InvalidKey("ciphertext is not valid hex"))?;
    let nonce_bytes = hex::decode(&envelope.nonce)
        .map_err(|_| CryptoError::InvalidKey("nonce is not valid hex"))?;
    if nonce_bytes.len() != 24 {
        return Err(CryptoError::InvalidKey("nonce must decode to 24 bytes"));
    }
    let sender_ephemeral = parse_public_hex(&envelope.sender_public_key)?;

    let eph_pub = X25519PublicKey::from(sender_ephemeral);
    let shared = self_identity.kex_secret().diffie_hellman(&eph_pub);
    let key = kdf_key(&shared.to_bytes(), &nonce_bytes);

    let cipher = XChaCha20Poly1305::new((&key).into());
    let inner = cipher
        .decrypt(
            XNonce::from_slice(&nonce_bytes),
            Payload {
                msg: &ciphertext,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::DecryptionFailed)?;

    Ok(split_inner(inner))
}

/// Split sealed-open plaintext on the *first* `|` and validate the 64-hex
/// prefix. A missing separator or malformed prefix is not a decryption
/// failure — the message is still shown, with an unresolved sender.
fn split_inner(inner: Vec<u8>) -> OpenedMessage {
    if let Some(sep_pos) = inner.iter().position(|&b| b == INNER_SEP) {
        let (prefix, rest) = inner.split_at(sep_pos);
        let tail = &rest[1..];
        if let Ok(prefix_str) = std::str::from_utf8(prefix) {
            if prefix_str.len() == 64 && prefix_str.bytes().all(|b| b.is_ascii_hexdigit()) {
                return OpenedMessage {
                    sender: SenderClaim::Known(prefix_str.to_lowercase()),
                    plaintext: tail.to_vec(),
                };
            }
        }
    }
    OpenedMessage {
        sender: SenderClaim::Unknown,
        plaintext: inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    #[test]
    fn round_trip_recovers_sender_and_plaintext() {
        let recipient = Identity::generate();
        let sender = Identity::generate();

        let env = seal(
            &recipient.public_bytes(),
            &sender.public_bytes(),
            b"hello",
            3600,
        )
        .unwrap();

        let opened = open(&recipient, &env).unwrap();
        assert_eq!(opened.plaintext, b"hello");
        assert_eq!(opened.sender, SenderClaim::Known(sender.public_hex()));
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let recipient = Identity::generate();
        let wrong = Identity::generate();
        let sender = Identity::generate();

        let env = seal(
            &recipient.public_bytes(),
            &sender.public_bytes(),
            b"hello",
            3600,
        )
        .unwrap();

        assert_eq!(open(&wrong, &env), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn token_is_deterministic_function_of_public_key() {
        let recipient = Identity::generate();
        let sender = Identity::generate();

        let env1 = seal(&recipient.public_bytes(), &sender.public_bytes(), b"a", 60).unwrap();
        let env2 = seal(&recipient.public_bytes(), &sender.public_bytes(), b"b", 60).unwrap();
        assert_eq!(env1.token, env2.token);
        assert_eq!(
            env1.token,
            hex::encode(derive_token(&recipient.public_bytes()))
        );
    }

    #[test]
    fn ephemeral_keys_and_ciphertexts_are_distinct_per_seal() {
        let recipient = Identity::generate();
        let sender = Identity::generate();

        let mut seen_keys = std::collections::HashSet::new();
        let mut seen_cts = std::collections::HashSet::new();
        for _ in 0..200 {
            let env = seal(
                &recipient.public_bytes(),
                &sender.public_bytes(),
                b"same message",
                60,
            )
            .unwrap();
            assert!(seen_keys.insert(env.sender_public_key));
            assert!(seen_cts.insert(env.ciphertext));
        }
    }

    #[test]
    fn malformed_inner_prefix_is_recoverable() {
        // Simulate a ciphertext that decrypts to a payload with no valid
        // 64-hex prefix by sealing with a plaintext that itself already
        // looks like "not-hex|payload" once the real prefix is stripped
        // away manually via split_inner's own logic.
        let opened = split_inner(b"not-hex|payload".to_vec());
        assert_eq!(opened.sender, SenderClaim::Unknown);
        assert_eq!(opened.plaintext, b"not-hex|payload");
    }

    #[test]
    fn ttl_is_clamped_into_bounds() {
        assert_eq!(clamp_ttl(10), MIN_TTL_SECS);
        assert_eq!(clamp_ttl(1_000_000), MAX_TTL_SECS);
        assert_eq!(clamp_ttl(120), 120);
    }

    #[test]
    fn default_ttl_constant_is_within_bounds() {
        assert_eq!(clamp_ttl(DEFAULT_TTL_SECS), DEFAULT_TTL_SECS);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::envelope::{open, seal, SenderClaim};
    use crate::hash::derive_token;
    use crate::identity::Identity;

    proptest! {
        /// Invariant 1: round-trip. Seal then open recovers the exact
        /// plaintext and the sender's public key.
        #[test]
        fn round_trip_recovers_plaintext_and_sender(
            plaintext in proptest::collection::vec(any::<u8>(), 0..256),
            ttl in 1u32..200_000,
        ) {
            let recipient = Identity::generate();
            let sender = Identity::generate();

            let env = seal(&recipient.public_bytes(), &sender.public_bytes(), &plaintext, ttl).unwrap();
            let opened = open(&recipient, &env).unwrap();

            prop_assert_eq!(opened.plaintext, plaintext);
            prop_assert_eq!(opened.sender, SenderClaim::Known(sender.public_hex()));
        }

        /// Invariant 2: wrong-key failure. Opening with any other identity's
        /// private key never succeeds and never leaks plaintext.
        #[test]
        fn wrong_recipient_cannot_open(
            plaintext in proptest::collection::vec(any::<u8>(), 0..128),
        ) {
            let recipient = Identity::generate();
            let impostor = Identity::generate();
            let sender = Identity::generate();

            let env = seal(&recipient.public_bytes(), &sender.public_bytes(), &plaintext, 3600).unwrap();
            prop_assert!(open(&impostor, &env).is_err());
        }

        /// Invariant 3: token determinism. Equal public keys always derive
        /// equal tokens, regardless of anything else about the message.
        #[test]
        fn token_derivation_is_pure(
            seed in any::<[u8; 32]>(),
        ) {
            let a = derive_token(&seed);
            let b = derive_token(&seed);
            prop_assert_eq!(a, b);
        }
    }

    /// Invariant 4: ephemeral distinctness. Repeated seals of identical
    /// inputs never reuse an ephemeral public key or produce identical
    /// ciphertext.
    #[test]
    fn repeated_seals_are_pairwise_distinct() {
        let recipient = Identity::generate();
        let sender = Identity::generate();

        let mut keys = std::collections::HashSet::new();
        let mut ciphertexts = std::collections::HashSet::new();
        for _ in 0..1000 {
            let env = seal(&recipient.public_bytes(), &sender.public_bytes(), b"constant", 3600).unwrap();
            assert!(keys.insert(env.sender_public_key), "ephemeral key reused");
            assert!(ciphertexts.insert(env.ciphertext), "ciphertext reused");
        }
    }
}

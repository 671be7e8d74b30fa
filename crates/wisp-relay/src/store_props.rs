use proptest::prelude::*;

use crate::store::{PutRequest, RelayStore, DEFAULT_PER_TOKEN_CAP};

fn put_req(token: &str, tag: u32, ttl: u32) -> PutRequest {
    PutRequest {
        token: token.to_string(),
        ciphertext: format!("ct-{tag}"),
        nonce: "00".repeat(24),
        sender_public_key: "11".repeat(32),
        ttl,
    }
}

proptest! {
    /// Invariant 5: arrival order. Any sequence of puts to one token comes
    /// back from poll in exactly that order.
    #[test]
    fn arrival_order_is_preserved(tags in prop::collection::vec(any::<u32>(), 1..30)) {
        let store = RelayStore::new(DEFAULT_PER_TOKEN_CAP);
        for &tag in &tags {
            store.put(put_req("tok", tag, 3600));
        }

        let polled = store.poll("tok");
        prop_assert_eq!(polled.len(), tags.len());
        for (entry, tag) in polled.iter().zip(tags.iter()) {
            prop_assert_eq!(&entry.ciphertext, &format!("ct-{tag}"));
        }
    }

    /// Invariant 6 (subset): consume never loses or duplicates what was put
    /// and not yet expired, and draining it twice never returns anything
    /// the second time.
    #[test]
    fn consume_returns_everything_exactly_once(tags in prop::collection::vec(any::<u32>(), 0..30)) {
        let store = RelayStore::new(DEFAULT_PER_TOKEN_CAP);
        for &tag in &tags {
            store.put(put_req("tok", tag, 3600));
        }

        let first = store.consume("tok");
        let second = store.consume("tok");

        prop_assert_eq!(first.len(), tags.len());
        prop_assert!(second.is_empty());
    }

    /// Invariant 8: an unseen token and a freshly fully-consumed token
    /// respond identically to poll and consume.
    #[test]
    fn unseen_and_emptied_tokens_are_indistinguishable(tags in prop::collection::vec(any::<u32>(), 0..10)) {
        let store = RelayStore::new(DEFAULT_PER_TOKEN_CAP);
        for &tag in &tags {
            store.put(put_req("tok", tag, 3600));
        }
        store.consume("tok");

        prop_assert_eq!(store.poll("tok"), store.poll("brand-new-token"));
        prop_assert_eq!(store.consume("tok"), store.consume("brand-new-token"));
    }

    /// Per-token soft cap always leaves the cap's worth of the most recent
    /// messages, oldest evicted first.
    #[test]
    fn cap_enforcement_keeps_newest_messages(
        cap in 1usize..20,
        tags in prop::collection::vec(any::<u32>(), 0..40),
    ) {
        let store = RelayStore::new(cap);
        for &tag in &tags {
            store.put(put_req("tok", tag, 3600));
        }

        let remaining = store.poll("tok");
        let expected_len = tags.len().min(cap);
        prop_assert_eq!(remaining.len(), expected_len);

        let expected_tail: Vec<u32> = tags
            .iter()
            .rev()
            .take(expected_len)
            .rev()
            .copied()
            .collect();
        for (entry, tag) in remaining.iter().zip(expected_tail.iter()) {
            prop_assert_eq!(&entry.ciphertext, &format!("ct-{tag}"));
        }
    }
}

//! Routes opened messages into per-peer history and tracks dispatch stats.
//!
//! Unlike a handler-registry dispatcher, there is only one kind of payload
//! here (opaque message bytes) and no signature to verify — the relay never
//! authenticates senders, so "dispatch" just means decrypt-then-file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tracing::warn;

use wisp_crypto::envelope::{self, SenderClaim};
use wisp_crypto::{CryptoError, Envelope, Identity};

/// Which way a message crossed the wire relative to this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// One message filed into a conversation's history — either decrypted from
/// an inbound envelope, or recorded locally after a successful outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMessage {
    pub sender: SenderClaim,
    pub plaintext: Vec<u8>,
    pub direction: Direction,
    /// Local wall-clock time the message was filed, epoch seconds.
    pub timestamp: u64,
}

fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct DispatchStats {
    pub received: AtomicU64,
    pub dispatched: AtomicU64,
    pub decryption_failures: AtomicU64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            decryption_failures: self.decryption_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    pub received: u64,
    pub dispatched: u64,
    pub decryption_failures: u64,
}

/// Key for an "unknown sender" bucket — messages whose embedded sender
/// prefix was missing or malformed still get filed, just not attributed.
const UNKNOWN_PEER: &str = "unknown";

/// Per-identity store of decrypted conversation history, keyed by the
/// counterparty's long-term public key (hex), falling back to `unknown`.
pub struct ConversationStore {
    identity: Identity,
    histories: RwLock<HashMap<String, Vec<ConversationMessage>>>,
    stats: Arc<DispatchStats>,
}

impl ConversationStore {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            histories: RwLock::new(HashMap::new()),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    /// This identity's own public key, hex-encoded — the `self_pub` half of
    /// the (self_pub, peer_pub) conversation tuple; every history this store
    /// holds is implicitly scoped to it.
    pub fn self_public_hex(&self) -> String {
        self.identity.public_hex()
    }

    /// Decrypt `envelope` addressed to this identity and file it into the
    /// sender's conversation history. Only a failed authentication tag is
    /// an error; an unresolved sender claim is still delivered.
    pub async fn dispatch(
        &self,
        envelope: &Envelope,
    ) -> Result<ConversationMessage, CryptoError> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let opened = envelope::open(&self.identity, envelope).map_err(|e| {
            warn!("failed to open envelope: {}", e);
            self.stats.decryption_failures.fetch_add(1, Ordering::Relaxed);
            e
        })?;

        let message = ConversationMessage {
            sender: opened.sender,
            plaintext: opened.plaintext,
            direction: Direction::Inbound,
            timestamp: now_epoch_seconds(),
        };

        let peer_key = match &message.sender {
            SenderClaim::Known(hex) => hex.clone(),
            SenderClaim::Unknown => UNKNOWN_PEER.to_string(),
        };

        let mut histories = self.histories.write().await;
        histories.entry(peer_key).or_default().push(message.clone());
        drop(histories);

        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(message)
    }

    /// File a message this identity just sent into `peer_public_hex`'s
    /// history. The relay and the wire format never round-trip outbound
    /// messages back to the sender, so the client is the only place that
    /// can record them — call this right after a successful `seal`+send.
    pub async fn record_outbound(&self, peer_public_hex: &str, plaintext: Vec<u8>) {
        let message = ConversationMessage {
            sender: SenderClaim::Known(self.identity.public_hex()),
            plaintext,
            direction: Direction::Outbound,
            timestamp: now_epoch_seconds(),
        };
        self.histories
            .write()
            .await
            .entry(peer_public_hex.to_string())
            .or_default()
            .push(message);
    }

    /// Clone of a peer's history so far, newest message last.
    pub async fn history(&self, peer_public_hex: &str) -> Vec<ConversationMessage> {
        self.histories
            .read()
            .await
            .get(peer_public_hex)
            .cloned()
            .unwrap_or_default()
    }

    /// All peers this store has ever filed a message under.
    pub async fn peers(&self) -> Vec<String> {
        self.histories.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_crypto::envelope::seal;

    #[tokio::test]
    async fn dispatch_files_message_under_sender_key() {
        let recipient = Identity::generate();
        let sender = Identity::generate();
        let store = ConversationStore::new(Identity::from_bytes(&recipient.private_bytes()));

        let env = seal(
            &recipient.public_bytes(),
            &sender.public_bytes(),
            b"hi there",
            3600,
        )
        .unwrap();

        let opened = store.dispatch(&env).await.unwrap();
        assert_eq!(opened.plaintext, b"hi there");
        assert_eq!(opened.sender, SenderClaim::Known(sender.public_hex()));

        let history = store.history(&sender.public_hex()).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].plaintext, b"hi there");

        let stats = store.stats().snapshot();
        assert_eq!(stats.received, 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.decryption_failures, 0);
    }

    #[tokio::test]
    async fn dispatch_records_decryption_failure() {
        let recipient = Identity::generate();
        let wrong = Identity::generate();
        let sender = Identity::generate();
        let store = ConversationStore::new(Identity::from_bytes(&wrong.private_bytes()));

        let env = seal(
            &recipient.public_bytes(),
            &sender.public_bytes(),
            b"hi there",
            3600,
        )
        .unwrap();

        let result = store.dispatch(&env).await;
        assert!(result.is_err());

        let stats = store.stats().snapshot();
        assert_eq!(stats.received, 1);
        assert_eq!(stats.dispatched, 0);
        assert_eq!(stats.decryption_failures, 1);
    }

    #[tokio::test]
    async fn multiple_peers_get_separate_histories() {
        let recipient = Identity::generate();
        let sender_a = Identity::generate();
        let sender_b = Identity::generate();
        let store = ConversationStore::new(Identity::from_bytes(&recipient.private_bytes()));

        let env_a = seal(&recipient.public_bytes(), &sender_a.public_bytes(), b"a", 3600).unwrap();
        let env_b = seal(&recipient.public_bytes(), &sender_b.public_bytes(), b"b", 3600).unwrap();

        store.dispatch(&env_a).await.unwrap();
        store.dispatch(&env_b).await.unwrap();

        assert_eq!(store.history(&sender_a.public_hex()).await.len(), 1);
        assert_eq!(store.history(&sender_b.public_hex()).await.len(), 1);

        let mut peers = store.peers().await;
        peers.sort();
        let mut expected = vec![sender_a.public_hex(), sender_b.public_hex()];
        expected.sort();
        assert_eq!(peers, expected);
    }

    #[tokio::test]
    async fn outbound_and_inbound_share_a_history_with_distinct_directions() {
        let recipient = Identity::generate();
        let sender = Identity::generate();
        let recipient_store = ConversationStore::new(Identity::from_bytes(&recipient.private_bytes()));
        let sender_store = ConversationStore::new(Identity::from_bytes(&sender.private_bytes()));

        sender_store
            .record_outbound(&recipient.public_hex(), b"hi".to_vec())
            .await;
        let sent = sender_store.history(&recipient.public_hex()).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].direction, Direction::Outbound);
        assert_eq!(sent[0].sender, SenderClaim::Known(sender.public_hex()));

        let env = seal(&recipient.public_bytes(), &sender.public_bytes(), b"hi", 3600).unwrap();
        recipient_store.dispatch(&env).await.unwrap();
        let received = recipient_store.history(&sender.public_hex()).await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].direction, Direction::Inbound);
    }
}

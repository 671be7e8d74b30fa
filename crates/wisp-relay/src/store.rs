//! In-memory relay store: a `token -> ordered queue of messages` map.
//!
//! Each token's queue lives behind dashmap's own per-shard locking, so a
//! `put`/`poll`/`consume` on one token never blocks one on another, and a
//! single token's queue is only ever touched by one caller at a time —
//! that's what makes `consume` atomic without a crate-wide lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::ids::{epoch_seconds, generate_message_id};

pub const MIN_TTL_SECS: u32 = 60;
pub const MAX_TTL_SECS: u32 = 86_400;
pub const DEFAULT_PER_TOKEN_CAP: usize = 1000;

/// Clamp a caller-supplied ttl into `[MIN_TTL_SECS, MAX_TTL_SECS]`.
pub fn clamp_ttl(ttl: u32) -> u32 {
    ttl.clamp(MIN_TTL_SECS, MAX_TTL_SECS)
}

/// A validated envelope ready to be appended to a token's queue.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub token: String,
    pub ciphertext: String,
    pub nonce: String,
    pub sender_public_key: String,
    pub ttl: u32,
}

/// The wire view of one message, returned by `poll`/`consume`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub message_id: String,
    pub ciphertext: String,
    pub nonce: String,
    pub sender_public_key: String,
    pub received_at: u64,
    pub ttl: u32,
}

struct Entry {
    message: StoredMessage,
    inserted: Instant,
    ttl: Duration,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted) >= self.ttl
    }
}

#[derive(Default)]
struct TokenQueue {
    entries: VecDeque<Entry>,
}

#[derive(Debug, Clone, Copy)]
pub struct Stats {
    pub active_tokens: usize,
    pub total_messages: usize,
    pub expired_swept_total: u64,
}

pub struct RelayStore {
    queues: DashMap<String, TokenQueue>,
    per_token_cap: usize,
    expired_swept_total: AtomicU64,
}

impl RelayStore {
    pub fn new(per_token_cap: usize) -> Self {
        Self {
            queues: DashMap::new(),
            per_token_cap,
            expired_swept_total: AtomicU64::new(0),
        }
    }

    /// Append `req` to its token's queue, assigning a fresh `message_id`.
    /// If the per-token cap is exceeded, the oldest message is dropped (FIFO).
    pub fn put(&self, req: PutRequest) -> String {
        let ttl_secs = clamp_ttl(req.ttl);
        let message_id = generate_message_id();
        let message = StoredMessage {
            message_id: message_id.clone(),
            ciphertext: req.ciphertext,
            nonce: req.nonce,
            sender_public_key: req.sender_public_key,
            received_at: epoch_seconds(),
            ttl: ttl_secs,
        };
        let entry = Entry {
            message,
            inserted: Instant::now(),
            ttl: Duration::from_secs(ttl_secs as u64),
        };

        let mut queue = self.queues.entry(req.token).or_default();
        queue.entries.push_back(entry);
        while queue.entries.len() > self.per_token_cap {
            queue.entries.pop_front();
        }

        message_id
    }

    /// Snapshot of all currently-live messages for `token`, oldest first.
    /// Never mutates arrival order; lazily drops anything found expired.
    pub fn poll(&self, token: &str) -> Vec<StoredMessage> {
        let now = Instant::now();
        let Some(mut queue) = self.queues.get_mut(token) else {
            return Vec::new();
        };
        queue.entries.retain(|e| !e.is_expired(now));
        queue.entries.iter().map(|e| e.message.clone()).collect()
    }

    /// Atomically return and remove every currently-live message for `token`.
    pub fn consume(&self, token: &str) -> Vec<StoredMessage> {
        let now = Instant::now();
        let Some(mut queue) = self.queues.get_mut(token) else {
            return Vec::new();
        };
        let taken = std::mem::take(&mut queue.entries);
        taken
            .into_iter()
            .filter(|e| !e.is_expired(now))
            .map(|e| e.message)
            .collect()
    }

    /// One janitor pass: drop expired messages from every token, and drop
    /// tokens left with an empty queue. Returns the number of messages swept.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut swept = 0usize;
        let mut emptied = Vec::new();

        for mut queue in self.queues.iter_mut() {
            let before = queue.entries.len();
            queue.entries.retain(|e| !e.is_expired(now));
            swept += before - queue.entries.len();
            if queue.entries.is_empty() {
                emptied.push(queue.key().clone());
            }
        }

        for token in emptied {
            // Re-check under the entry lock: a put may have landed since the
            // scan above decided this token looked empty.
            if let dashmap::mapref::entry::Entry::Occupied(occupied) =
                self.queues.entry(token)
            {
                if occupied.get().entries.is_empty() {
                    occupied.remove();
                }
            }
        }

        if swept > 0 {
            self.expired_swept_total
                .fetch_add(swept as u64, Ordering::Relaxed);
        }
        swept
    }

    pub fn stats(&self) -> Stats {
        let total_messages: usize = self.queues.iter().map(|q| q.entries.len()).sum();
        Stats {
            active_tokens: self.queues.len(),
            total_messages,
            expired_swept_total: self.expired_swept_total.load(Ordering::Relaxed),
        }
    }
}

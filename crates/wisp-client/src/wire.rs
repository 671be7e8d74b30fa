//! Mirrors of the relay's JSON schemas (§6). Kept independent of the relay
//! crate so the client only ever depends on the wire contract, not the
//! server's internal types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SendRequestBody {
    pub token: String,
    pub ciphertext: String,
    pub nonce: String,
    pub sender_public_key: String,
    pub ttl: u32,
}

#[derive(Debug, Deserialize)]
pub struct SendResponseBody {
    pub message_id: String,
    pub accepted_at: u64,
}

#[derive(Debug, Serialize)]
pub struct TokenRequestBody {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredMessageView {
    pub message_id: String,
    pub ciphertext: String,
    pub nonce: String,
    pub sender_public_key: String,
    pub received_at: u64,
    pub ttl: u32,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponseBody {
    pub messages: Vec<StoredMessageView>,
    #[allow(dead_code)]
    pub count: usize,
}

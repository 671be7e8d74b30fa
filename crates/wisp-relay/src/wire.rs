//! Tagged wire records for the HTTP surface, validated at decode time.
//! Handlers only ever see a validated record — never a loose JSON map.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::store::{PutRequest, StoredMessage};

/// Matches `^[0-9a-f]{64}$` exactly — uppercase hex is rejected, not
/// normalized, since the canonical form is lowercase.
fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub token: String,
    pub ciphertext: String,
    pub nonce: String,
    pub sender_public_key: String,
    pub ttl: i64,
}

impl SendRequest {
    /// Validate every field per the wire schema and turn this into a
    /// store-ready `PutRequest`. `ttl` is rejected if negative or
    /// non-representable as u32; in-range-but-outside-policy values are
    /// clamped downstream by the store, not here.
    pub fn into_put_request(self) -> Result<PutRequest, ApiError> {
        if !is_hex64(&self.token) {
            return Err(ApiError::Validation {
                field: "token",
                reason: "token must be 64 lowercase hex characters",
            });
        }
        if !is_hex64(&self.sender_public_key) {
            return Err(ApiError::Validation {
                field: "sender_public_key",
                reason: "sender_public_key must be 64 lowercase hex characters",
            });
        }
        let ciphertext_bytes = hex::decode(&self.ciphertext).map_err(|_| ApiError::Validation {
            field: "ciphertext",
            reason: "ciphertext must be valid hex",
        })?;
        if ciphertext_bytes.is_empty() {
            return Err(ApiError::Validation {
                field: "ciphertext",
                reason: "ciphertext must be non-empty",
            });
        }
        let nonce_bytes = hex::decode(&self.nonce).map_err(|_| ApiError::Validation {
            field: "nonce",
            reason: "nonce must be valid hex",
        })?;
        if nonce_bytes.len() != 24 {
            return Err(ApiError::Validation {
                field: "nonce",
                reason: "nonce must decode to exactly 24 bytes",
            });
        }
        if self.ttl < 0 || self.ttl > u32::MAX as i64 {
            return Err(ApiError::Validation {
                field: "ttl",
                reason: "ttl must be a non-negative integer",
            });
        }

        Ok(PutRequest {
            token: self.token,
            ciphertext: self.ciphertext,
            nonce: self.nonce,
            sender_public_key: self.sender_public_key,
            ttl: self.ttl as u32,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message_id: String,
    pub accepted_at: u64,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

impl TokenRequest {
    pub fn validated_token(&self) -> Result<&str, ApiError> {
        if !is_hex64(&self.token) {
            return Err(ApiError::Validation {
                field: "token",
                reason: "token must be 64 lowercase hex characters",
            });
        }
        Ok(&self.token)
    }
}

#[derive(Debug, Serialize)]
pub struct StoredMessageView {
    pub message_id: String,
    pub ciphertext: String,
    pub nonce: String,
    pub sender_public_key: String,
    pub received_at: u64,
    pub ttl: u32,
}

impl From<StoredMessage> for StoredMessageView {
    fn from(m: StoredMessage) -> Self {
        Self {
            message_id: m.message_id,
            ciphertext: m.ciphertext,
            nonce: m.nonce,
            sender_public_key: m.sender_public_key,
            received_at: m.received_at,
            ttl: m.ttl,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<StoredMessageView>,
    pub count: usize,
}

impl MessagesResponse {
    pub fn from_messages(messages: Vec<StoredMessage>) -> Self {
        let count = messages.len();
        Self {
            messages: messages.into_iter().map(StoredMessageView::from).collect(),
            count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub active_tokens: usize,
    pub total_messages: usize,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

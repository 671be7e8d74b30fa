//! Opaque identifiers and timestamps used by the store and API layers.

use std::time::{SystemTime, UNIX_EPOCH};

/// A random 128-bit identifier, hex-encoded. Used for `message_id`; carries
/// no structure a client could use to infer ordering or count.
pub fn generate_message_id() -> String {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).expect("OS random source unavailable");
    hex::encode(bytes)
}

/// Current wall-clock time as whole seconds since the Unix epoch.
pub fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs()
}

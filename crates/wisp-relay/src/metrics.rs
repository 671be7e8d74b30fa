//! Counters backing `/api/v1/status`. Plain atomics: the status endpoint
//! exposes a handful of integers, not a scrape surface, so there's nothing
//! here that needs a metrics-registry dependency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct Metrics {
    started_at: Instant,
    messages_sent: AtomicU64,
    messages_polled: AtomicU64,
    messages_consumed: AtomicU64,
    rate_limit_rejections: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            messages_sent: AtomicU64::new(0),
            messages_polled: AtomicU64::new(0),
            messages_consumed: AtomicU64::new(0),
            rate_limit_rejections: AtomicU64::new(0),
        }
    }

    pub fn record_send(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll(&self, count: usize) {
        self.messages_polled
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_consume(&self, count: usize) {
        self.messages_consumed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

pub static MESSAGES_SENT_TOTAL: AtomicU64 = AtomicU64::new(0);
pub static MESSAGES_RECEIVED_TOTAL: AtomicU64 = AtomicU64::new(0);
pub static SEND_FAILURES_TOTAL: AtomicU64 = AtomicU64::new(0);
pub static MALFORMED_TOTAL: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageCounters {
    pub sent: u64,
    pub received: u64,
    pub send_failures: u64,
    pub malformed: u64,
}

pub fn record_sent() {
    MESSAGES_SENT_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_received() {
    MESSAGES_RECEIVED_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_send_failure() {
    SEND_FAILURES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_malformed() {
    MALFORMED_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MessageCounters {
    MessageCounters {
        sent: MESSAGES_SENT_TOTAL.load(Ordering::Relaxed),
        received: MESSAGES_RECEIVED_TOTAL.load(Ordering::Relaxed),
        send_failures: SEND_FAILURES_TOTAL.load(Ordering::Relaxed),
        malformed: MALFORMED_TOTAL.load(Ordering::Relaxed),
    }
}

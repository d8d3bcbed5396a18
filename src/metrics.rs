//! Counters for observing link behavior
//!
//! Every [`ArqSession`](crate::link::ArqSession) holds an
//! `Arc<LinkMetrics>`; all counters are relaxed atomics, cheap enough to
//! bump on every frame.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-session counters
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// DATA frame transmissions, including retransmissions
    pub data_frames_sent: AtomicU64,
    /// Transmissions beyond the first attempt of a send
    pub retransmissions: AtomicU64,
    /// ACK frames received for a waiting send
    pub acks_received: AtomicU64,
    /// NACK frames received for a waiting send
    pub nacks_received: AtomicU64,
    /// ACK frames sent back to the peer
    pub acks_sent: AtomicU64,
    /// NACK frames sent back to the peer
    pub nacks_sent: AtomicU64,
    /// Payloads surfaced to the upper layer
    pub deliveries: AtomicU64,
    /// DATA frames acknowledged but not re-delivered
    pub duplicates_suppressed: AtomicU64,
    /// DATA frames whose checksum did not match
    pub checksum_failures: AtomicU64,
    /// ACK/NACK frames with no waiting sender
    pub stale_replies: AtomicU64,
    /// Sends that exhausted every attempt
    pub sends_exhausted: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub data_frames_sent: u64,
    pub retransmissions: u64,
    pub acks_received: u64,
    pub nacks_received: u64,
    pub acks_sent: u64,
    pub nacks_sent: u64,
    pub deliveries: u64,
    pub duplicates_suppressed: u64,
    pub checksum_failures: u64,
    pub stale_replies: u64,
    pub sends_exhausted: u64,
}

impl LinkMetrics {
    /// Create a fresh set of counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            data_frames_sent: self.data_frames_sent.load(Ordering::Relaxed),
            retransmissions: self.retransmissions.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            nacks_received: self.nacks_received.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            nacks_sent: self.nacks_sent.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            stale_replies: self.stale_replies.load(Ordering::Relaxed),
            sends_exhausted: self.sends_exhausted.load(Ordering::Relaxed),
        }
    }
}

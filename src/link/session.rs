//! Stop-and-wait ARQ session
//!
//! [`ArqSession`] owns the retry/acknowledgment state machine. A `send`
//! builds one DATA frame, transmits it, and blocks the caller until an
//! ACK arrives or every attempt is spent; the receive side verifies
//! checksums, answers ACK/NACK, and surfaces each payload upward exactly
//! once.
//!
//! The only shared mutable state is one mutex-guarded struct holding the
//! per-sequence wait slots and the delivered ring. A wait slot is
//! registered under that mutex *before* the first transmission, and its
//! [`Notify`] stores a permit if the reply beats the sender to
//! `notified()`, so a fast reply is never lost.
//!
//! One request is outstanding at a time: a sequence number either
//! completes within its `send` call or is abandoned when the call
//! returns. Late replies for an abandoned sequence find no wait slot and
//! are discarded.

use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;
use crate::crc::GeneratorPoly;
use crate::error::Result;
use crate::frame::{self, Frame, FrameHeader, FrameType};
use crate::metrics::LinkMetrics;
use crate::transport::Transport;

/// Externally observable result of one `send` call.
///
/// Exhaustion is a normal outcome, not an error; only transport and
/// configuration failures surface as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The peer acknowledged the frame
    Acked { seq: u8, attempts: u32 },
    /// Every attempt timed out or was NACKed
    Exhausted { seq: u8, attempts: u32 },
}

impl SendOutcome {
    /// True if the peer acknowledged the frame
    pub fn is_acked(&self) -> bool {
        matches!(self, SendOutcome::Acked { .. })
    }

    /// Sequence number the send used
    pub fn seq(&self) -> u8 {
        match self {
            SendOutcome::Acked { seq, .. } | SendOutcome::Exhausted { seq, .. } => *seq,
        }
    }

    /// Transmissions performed
    pub fn attempts(&self) -> u32 {
        match self {
            SendOutcome::Acked { attempts, .. } | SendOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// A payload surfaced to the upper layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub seq: u8,
    pub payload: Bytes,
}

/// Per-sequence synchronization record: the reply outcome and the signal
/// that wakes the blocked sender.
struct WaitSlot {
    /// `Some(true)` = ACK, `Some(false)` = NACK, `None` = nothing yet
    outcome: Option<bool>,
    notify: Arc<Notify>,
}

/// State guarded by the session's single mutex.
struct Shared {
    wait_slots: HashMap<u8, WaitSlot>,
    /// Duplicate-suppression ring keyed by sequence number. Delivering
    /// seq `s` marks slot `s` and clears slot `(s + 128) % 256`, so the
    /// ring covers the most recent half of the sequence space and a
    /// number reused after wraparound delivers again.
    delivered: [bool; 256],
}

/// Stop-and-wait ARQ endpoint over a message transport.
pub struct ArqSession<T: Transport> {
    transport: Arc<T>,
    peer_addr: SocketAddr,
    poly: GeneratorPoly,
    config: LinkConfig,
    next_seq: AtomicU8,
    shared: Mutex<Shared>,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
    metrics: Arc<LinkMetrics>,
}

impl<T: Transport> ArqSession<T> {
    /// Create a session speaking to `peer_addr` over `transport`.
    ///
    /// Returns the session and the channel on which received payloads are
    /// delivered. Fails fast on an invalid configuration.
    pub fn new(
        transport: Arc<T>,
        peer_addr: SocketAddr,
        config: LinkConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Delivery>)> {
        config.validate()?;
        let poly = config.parsed_generator()?;
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();

        let session = Self {
            transport,
            peer_addr,
            poly,
            config,
            next_seq: AtomicU8::new(0),
            shared: Mutex::new(Shared {
                wait_slots: HashMap::new(),
                delivered: [false; 256],
            }),
            delivery_tx,
            metrics: Arc::new(LinkMetrics::new()),
        };
        Ok((session, delivery_rx))
    }

    /// Address of the peer this session talks to
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// The generator polynomial in use
    pub fn generator(&self) -> &GeneratorPoly {
        &self.poly
    }

    /// Counters for this session
    pub fn metrics(&self) -> Arc<LinkMetrics> {
        self.metrics.clone()
    }

    /// Frame user input and send it reliably.
    ///
    /// Raw bit strings are packed to bytes, anything else goes as UTF-8.
    pub async fn send_text(&self, text: &str) -> Result<SendOutcome> {
        self.send(frame::payload_from_text(text)).await
    }

    /// Send one payload reliably.
    ///
    /// Blocks the caller for up to `max_retries × ack_timeout` plus retry
    /// pauses. The DATA frame is built once and retransmitted verbatim;
    /// sequence number and payload never change across attempts. A
    /// transport-level send failure aborts the retry loop immediately and
    /// comes back as `Err`; exhaustion comes back as
    /// `Ok(SendOutcome::Exhausted)`.
    pub async fn send(&self, payload: Bytes) -> Result<SendOutcome> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut data = frame::build_data(&payload, &self.poly, seq)?;

        if self.config.inject_bit_error && !payload.is_empty() {
            let mut corrupted = data.to_vec();
            corrupted[FrameHeader::SIZE] ^= 0x01;
            data = Bytes::from(corrupted);
            debug!(seq, "bit error injected into outbound DATA frame");
        }

        // Register the wait slot before the first transmission so a reply
        // cannot arrive while nobody is listed for the sequence.
        let notify = {
            let mut shared = self.shared.lock().await;
            let notify = Arc::new(Notify::new());
            shared.wait_slots.insert(
                seq,
                WaitSlot {
                    outcome: None,
                    notify: notify.clone(),
                },
            );
            notify
        };

        let result = self.run_attempts(seq, &data, &notify).await;

        // The slot is removed whatever happened; a late reply after this
        // point is discarded by the receive path.
        {
            let mut shared = self.shared.lock().await;
            shared.wait_slots.remove(&seq);
        }

        result
    }

    async fn run_attempts(&self, seq: u8, data: &Bytes, notify: &Notify) -> Result<SendOutcome> {
        for attempt in 1..=self.config.max_retries {
            debug!(
                seq,
                attempt,
                max = self.config.max_retries,
                "transmitting DATA frame"
            );
            if let Err(e) = self.transport.send_to(data, self.peer_addr).await {
                warn!(seq, error = %e, "transport send failed, aborting retries");
                return Err(e.into());
            }
            LinkMetrics::incr(&self.metrics.data_frames_sent);
            if attempt > 1 {
                LinkMetrics::incr(&self.metrics.retransmissions);
            }

            match timeout(self.config.ack_timeout, notify.notified()).await {
                Ok(()) => {
                    let outcome = {
                        let mut shared = self.shared.lock().await;
                        shared
                            .wait_slots
                            .get_mut(&seq)
                            .and_then(|slot| slot.outcome.take())
                    };
                    match outcome {
                        Some(true) => {
                            info!(seq, attempt, "acknowledged");
                            return Ok(SendOutcome::Acked { seq, attempts: attempt });
                        }
                        Some(false) => {
                            debug!(seq, attempt, "NACK received, retrying");
                            sleep(self.config.retry_delay).await;
                        }
                        None => {
                            // Woken without a stored outcome; treat like a timeout.
                            trace!(seq, attempt, "spurious wakeup");
                            sleep(self.config.retry_delay).await;
                        }
                    }
                }
                Err(_) => {
                    debug!(seq, attempt, "timed out waiting for reply");
                    sleep(self.config.retry_delay).await;
                }
            }
        }

        LinkMetrics::incr(&self.metrics.sends_exhausted);
        warn!(
            seq,
            attempts = self.config.max_retries,
            "gave up after exhausting every attempt"
        );
        Ok(SendOutcome::Exhausted {
            seq,
            attempts: self.config.max_retries,
        })
    }

    /// Process one complete inbound message.
    ///
    /// Unparsable frames fail here and trigger no protocol action: with
    /// an untrustworthy header there is nothing safe to acknowledge.
    pub async fn handle_frame(&self, bytes: Bytes) -> Result<()> {
        let parsed = frame::parse(bytes, &self.poly)?;
        match parsed.header.frame_type {
            FrameType::Data => self.handle_data(parsed).await,
            FrameType::Ack | FrameType::Nack => self.handle_reply(parsed).await,
        }
        Ok(())
    }

    async fn handle_data(&self, data: Frame) {
        let seq = data.header.seq;

        if !data.crc_ok {
            LinkMetrics::incr(&self.metrics.checksum_failures);
            warn!(
                seq,
                crc_recv = data.crc_recv,
                crc_calc = data.crc_calc,
                "checksum mismatch, payload discarded"
            );
            self.send_reply(seq, false).await;
            return;
        }

        let fresh = {
            let mut shared = self.shared.lock().await;
            let idx = seq as usize;
            if shared.delivered[idx] {
                false
            } else {
                shared.delivered[idx] = true;
                shared.delivered[(idx + 128) % 256] = false;
                true
            }
        };

        if fresh {
            LinkMetrics::incr(&self.metrics.deliveries);
            trace!(seq, bytes = data.payload.len(), "payload delivered");
            let _ = self.delivery_tx.send(Delivery {
                seq,
                payload: data.payload,
            });
        } else {
            LinkMetrics::incr(&self.metrics.duplicates_suppressed);
            debug!(seq, "duplicate DATA frame, acknowledged without delivery");
        }

        // Duplicates are acknowledged too: the peer only stops resending
        // once an ACK gets through.
        self.send_reply(seq, true).await;
    }

    async fn handle_reply(&self, reply: Frame) {
        let seq = reply.header.seq;
        let positive = reply.header.frame_type == FrameType::Ack;
        if positive {
            LinkMetrics::incr(&self.metrics.acks_received);
        } else {
            LinkMetrics::incr(&self.metrics.nacks_received);
        }

        let mut shared = self.shared.lock().await;
        match shared.wait_slots.get_mut(&seq) {
            Some(slot) => {
                slot.outcome = Some(positive);
                slot.notify.notify_one();
                trace!(
                    seq,
                    frame_type = reply.header.frame_type.as_str(),
                    "waiting sender signaled"
                );
            }
            None => {
                // The sender already gave up, or the sequence is unknown.
                LinkMetrics::incr(&self.metrics.stale_replies);
                trace!(
                    seq,
                    frame_type = reply.header.frame_type.as_str(),
                    "reply with no waiting sender, discarded"
                );
            }
        }
    }

    async fn send_reply(&self, seq: u8, positive: bool) {
        let reply = match frame::build_reply(seq, positive, &self.poly) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(seq, error = %e, "failed to build reply frame");
                return;
            }
        };
        if let Err(e) = self.transport.send_to(&reply, self.peer_addr).await {
            // Best effort: the peer's retry loop covers a lost reply.
            warn!(seq, positive, error = %e, "failed to send reply");
            return;
        }
        if positive {
            LinkMetrics::incr(&self.metrics.acks_sent);
        } else {
            LinkMetrics::incr(&self.metrics.nacks_sent);
        }
    }
}

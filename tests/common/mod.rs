//! Shared test helpers for link integration tests

#![allow(dead_code)]

use bytes::Bytes;
use crclink::transport::{SendFuture, Transport};
use crclink::{ArqSession, Delivery, LinkConfig};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// In-memory transport: every sent frame lands on a channel instead of a
/// network, and sends can be forced to fail.
pub struct MockTransport {
    sent_tx: mpsc::UnboundedSender<Bytes>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    /// Create a transport and the channel its sent frames appear on.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Bytes>) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sent_tx,
                fail_sends: AtomicBool::new(false),
            }),
            sent_rx,
        )
    }

    /// Make every subsequent send fail with `BrokenPipe`.
    pub fn fail_sends(&self, enabled: bool) {
        self.fail_sends.store(enabled, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    fn send_to<'a>(&'a self, frame: &'a [u8], _target: SocketAddr) -> SendFuture<'a> {
        let result = if self.fail_sends.load(Ordering::SeqCst) {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock send failure"))
        } else {
            self.sent_tx
                .send(Bytes::copy_from_slice(frame))
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "mock channel closed"))
        };
        Box::pin(async move { result })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(test_addr())
    }
}

/// Placeholder address for sessions that never touch a real socket.
pub fn test_addr() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

/// Session over a mock transport, plus its delivery and sent-frame
/// channels.
pub struct MockEndpoint {
    pub session: Arc<ArqSession<MockTransport>>,
    pub transport: Arc<MockTransport>,
    pub deliveries: mpsc::UnboundedReceiver<Delivery>,
    pub sent_rx: Option<mpsc::UnboundedReceiver<Bytes>>,
}

/// Build a session over a fresh [`MockTransport`].
pub fn mock_endpoint(config: LinkConfig) -> MockEndpoint {
    let (transport, sent_rx) = MockTransport::new();
    let (session, deliveries) =
        ArqSession::new(transport.clone(), test_addr(), config).unwrap();
    MockEndpoint {
        session: Arc::new(session),
        transport,
        deliveries,
        sent_rx: Some(sent_rx),
    }
}

/// Wire two mock endpoints to each other: everything one side sends is
/// fed to the other side's `handle_frame`, simulating a perfect network.
pub fn linked_pair(config_a: LinkConfig, config_b: LinkConfig) -> (MockEndpoint, MockEndpoint) {
    let mut a = mock_endpoint(config_a);
    let mut b = mock_endpoint(config_b);

    let mut a_sent = a.sent_rx.take().unwrap();
    let mut b_sent = b.sent_rx.take().unwrap();

    let b_session = b.session.clone();
    tokio::spawn(async move {
        while let Some(frame) = a_sent.recv().await {
            let _ = b_session.handle_frame(frame).await;
        }
    });

    let a_session = a.session.clone();
    tokio::spawn(async move {
        while let Some(frame) = b_sent.recv().await {
            let _ = a_session.handle_frame(frame).await;
        }
    });

    (a, b)
}

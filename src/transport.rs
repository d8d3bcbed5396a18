//! Whole-message transport abstraction
//!
//! The [`Transport`] trait is the link's only way to put bytes on the
//! network. It is deliberately message-oriented and fire-and-forget: one
//! call sends one complete frame, and any reply arrives later as an
//! independent inbound message. The trait is object-safe so sessions can
//! hold an `Arc<dyn Transport>` or stay generic.
//!
//! [`TcpTransport`] is the built-in implementation: every outbound frame
//! opens a fresh connection, writes all bytes, and closes; every inbound
//! connection is read to EOF and surfaced as one [`InboundMessage`]. There
//! is no in-connection framing; one connection carries exactly one
//! message.

use bytes::Bytes;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Boxed future returned by [`Transport::send_to`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

/// Message-oriented outbound transport used by
/// [`ArqSession`](crate::link::ArqSession).
pub trait Transport: Send + Sync + 'static {
    /// Send one complete frame to `target`.
    ///
    /// Fire-and-forget: a reply, if any, arrives as a separate inbound
    /// message.
    fn send_to<'a>(&'a self, frame: &'a [u8], target: SocketAddr) -> SendFuture<'a>;

    /// Return the local address this transport accepts messages on.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// One complete inbound message and where it came from.
///
/// `peer` is the address of the connection's remote end. Because each
/// message rides its own short-lived connection, its port is ephemeral;
/// replies go to the peer's configured listen address, not back here.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub payload: Bytes,
    pub peer: SocketAddr,
}

/// TCP transport: one connection per message, read to EOF on receive.
pub struct TcpTransport {
    local_addr: SocketAddr,
    connect_timeout: Duration,
    accept_task: tokio::task::JoinHandle<()>,
}

impl TcpTransport {
    /// Bind a listener on `addr` and start accepting inbound messages.
    ///
    /// Each accepted connection is handled on its own task: the byte
    /// stream is read until the peer closes its sending side, then handed
    /// to the returned channel as one message. Empty streams are dropped.
    pub async fn bind(
        addr: SocketAddr,
        connect_timeout: Duration,
    ) -> io::Result<(Self, mpsc::UnboundedReceiver<InboundMessage>)> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let accept_task = tokio::spawn(accept_loop(listener, inbound_tx));
        debug!(%local_addr, "transport listening");

        Ok((
            Self {
                local_addr,
                connect_timeout,
                accept_task,
            },
            inbound_rx,
        ))
    }

    /// Stop accepting inbound connections.
    pub fn shutdown(&self) {
        self.accept_task.abort();
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(listener: TcpListener, inbound_tx: mpsc::UnboundedSender<InboundMessage>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let inbound_tx = inbound_tx.clone();
                tokio::spawn(async move {
                    match read_message(stream).await {
                        Ok(payload) if !payload.is_empty() => {
                            trace!(%peer, bytes = payload.len(), "inbound message");
                            let _ = inbound_tx.send(InboundMessage { payload, peer });
                        }
                        Ok(_) => trace!(%peer, "empty inbound stream dropped"),
                        Err(e) => warn!(%peer, error = %e, "inbound read failed"),
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

async fn read_message(mut stream: TcpStream) -> io::Result<Bytes> {
    let mut buf = Vec::with_capacity(4096);
    stream.read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

impl Transport for TcpTransport {
    fn send_to<'a>(&'a self, frame: &'a [u8], target: SocketAddr) -> SendFuture<'a> {
        Box::pin(async move {
            let mut stream = timeout(self.connect_timeout, TcpStream::connect(target))
                .await
                .map_err(|_| {
                    io::Error::new(io::ErrorKind::TimedOut, "connect timed out")
                })??;
            stream.write_all(frame).await?;
            stream.shutdown().await?;
            Ok(())
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local_addr)
    }
}

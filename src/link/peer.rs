//! TCP-wired link endpoint
//!
//! [`LinkPeer`] ties an [`ArqSession`] to a [`TcpTransport`]: it binds the
//! listener, routes every inbound message into the session on a
//! background task, and exposes the send/receive API application code
//! actually uses.

use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::LinkConfig;
use crate::error::Result;
use crate::link::session::{ArqSession, Delivery, SendOutcome};
use crate::metrics::LinkMetrics;
use crate::transport::{TcpTransport, Transport};

/// A reliable link endpoint bound to a local address and aimed at one
/// peer.
pub struct LinkPeer {
    transport: Arc<TcpTransport>,
    session: Arc<ArqSession<TcpTransport>>,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
    dispatch_task: tokio::task::JoinHandle<()>,
}

impl LinkPeer {
    /// Bind `listen_addr` and create a session talking to `peer_addr`.
    ///
    /// Use port 0 in `listen_addr` to let the OS pick; [`local_addr`]
    /// reports the bound address.
    ///
    /// [`local_addr`]: LinkPeer::local_addr
    pub async fn bind(
        listen_addr: SocketAddr,
        peer_addr: SocketAddr,
        config: LinkConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (transport, inbound_rx) =
            TcpTransport::bind(listen_addr, config.connect_timeout).await?;
        Self::with_transport(transport, inbound_rx, peer_addr, config)
    }

    /// Wire an already-bound transport to `peer_addr`.
    ///
    /// Useful when the listen port must be known before the peer address
    /// is (e.g. two endpoints bound to port 0 and then aimed at each
    /// other).
    pub fn with_transport(
        transport: TcpTransport,
        mut inbound_rx: mpsc::UnboundedReceiver<crate::transport::InboundMessage>,
        peer_addr: SocketAddr,
        config: LinkConfig,
    ) -> Result<Self> {
        let transport = Arc::new(transport);
        let (session, deliveries) = ArqSession::new(transport.clone(), peer_addr, config)?;
        let session = Arc::new(session);

        // One task drains the transport; each message either advances the
        // session or is logged and dropped.
        let dispatch_session = session.clone();
        let dispatch_task = tokio::spawn(async move {
            while let Some(message) = inbound_rx.recv().await {
                if let Err(e) = dispatch_session.handle_frame(message.payload).await {
                    warn!(peer = %message.peer, error = %e, "discarding unusable frame");
                }
            }
        });

        info!(
            listen = %transport.local_addr()?,
            peer = %peer_addr,
            "link peer up"
        );

        Ok(Self {
            transport,
            session,
            deliveries,
            dispatch_task,
        })
    }

    /// Send one payload reliably; see [`ArqSession::send`].
    pub async fn send(&self, payload: Bytes) -> Result<SendOutcome> {
        self.session.send(payload).await
    }

    /// Frame user input and send it reliably; see
    /// [`ArqSession::send_text`].
    pub async fn send_text(&self, text: &str) -> Result<SendOutcome> {
        self.session.send_text(text).await
    }

    /// Wait for the next payload delivered by the peer.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.deliveries.recv().await
    }

    /// The bound listen address
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The underlying session, for direct access to its state
    pub fn session(&self) -> &Arc<ArqSession<TcpTransport>> {
        &self.session
    }

    /// Counters for this endpoint
    pub fn metrics(&self) -> Arc<LinkMetrics> {
        self.session.metrics()
    }

    /// Stop accepting inbound messages and tear down the dispatch task.
    pub fn close(&self) {
        self.transport.shutdown();
        self.dispatch_task.abort();
    }
}

impl Drop for LinkPeer {
    fn drop(&mut self) {
        self.close();
    }
}

//! # crclink: CRC-checked reliable delivery over message transports
//!
//! A small reliable-delivery link built from three pieces: a bit-level
//! CRC engine, a binary frame codec, and a stop-and-wait ARQ session
//! that retransmits unacknowledged data until success or exhaustion.
//!
//! ## Features
//!
//! - **Two CRC engines**: a streaming shift-register mode for on-wire
//!   checksums and a textbook long-division mode for verification and
//!   step-by-step traces
//! - **Compact frames**: 5-byte header, payload, one checksum byte
//! - **Stop-and-wait ARQ**: timeout-driven retransmission with ACK/NACK,
//!   duplicate suppression, and wrapping 8-bit sequence numbers
//! - **Pluggable transport**: any whole-message transport works; TCP
//!   (one connection = one message) ships in the box
//! - **Observability**: `tracing` throughout plus per-session counters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crclink::{LinkConfig, LinkPeer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LinkConfig::new().generator("1011");
//!     let mut peer = LinkPeer::bind(
//!         "127.0.0.1:5000".parse()?,
//!         "127.0.0.1:5001".parse()?,
//!         config,
//!     )
//!     .await?;
//!
//!     // Send reliably: retries until ACKed or attempts run out
//!     let outcome = peer.send_text("hello over a noisy wire").await?;
//!     println!("sent: {:?}", outcome);
//!
//!     // Receive what the other side sends us
//!     if let Some(delivery) = peer.recv().await {
//!         println!("got seq={} {:?}", delivery.seq, delivery.payload);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │      LinkPeer       │  bind, send/send_text, recv
//! ├─────────────────────┤
//! │     ArqSession      │  retry loop, wait slots, duplicate ring
//! ├─────────────────────┤
//! │     frame codec     │  header + payload + checksum byte
//! ├─────────────────────┤
//! │     CRC engines     │  register mode (wire), long division (verify)
//! ├─────────────────────┤
//! │      Transport      │  whole-message send/receive (TCP built in)
//! └─────────────────────┘
//! ```

pub mod config;
pub mod crc;
pub mod error;
pub mod frame;
pub mod link;
pub mod metrics;
pub mod transport;

// Re-exports
pub use config::LinkConfig;
pub use crc::GeneratorPoly;
pub use error::{FrameError, LinkError, Result};
pub use frame::FrameType;
pub use link::{ArqSession, Delivery, LinkPeer, SendOutcome};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use transport::{TcpTransport, Transport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: u8 = frame::VERSION;

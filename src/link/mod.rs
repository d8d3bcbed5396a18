//! Reliable-delivery layer: ARQ session plus TCP-wired peer

pub mod peer;
pub mod session;

pub use peer::LinkPeer;
pub use session::{ArqSession, Delivery, SendOutcome};

//! Interactive link peer: type lines, send them reliably, print what the
//! other side delivers.
//!
//! Run one peer per terminal:
//!
//! ```text
//! cargo run --example link_peer -- 127.0.0.1:5000 127.0.0.1:5001
//! cargo run --example link_peer -- 127.0.0.1:5001 127.0.0.1:5000
//! ```
//!
//! A line of only 0/1 (spaces allowed) is sent as raw bits; anything else
//! goes as UTF-8 text. Pass a generator polynomial as the third argument
//! to override the default.

use crclink::{LinkConfig, LinkPeer};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <listen_addr> <peer_addr> [generator_bits]", args[0]);
        eprintln!("Example: {} 127.0.0.1:5000 127.0.0.1:5001 1011", args[0]);
        return Ok(());
    }

    let listen_addr: SocketAddr = args[1].parse()?;
    let peer_addr: SocketAddr = args[2].parse()?;
    let mut config = LinkConfig::new();
    if let Some(gen) = args.get(3) {
        config = config.generator(gen.clone());
    }

    let mut peer = LinkPeer::bind(listen_addr, peer_addr, config).await?;
    info!(listen = %peer.local_addr()?, peer = %peer_addr, "peer ready");

    // sends go through the session handle; the peer itself moves into the
    // receive task and prints deliveries as they arrive
    let session = peer.session().clone();
    let recv_task = tokio::spawn(async move {
        while let Some(delivery) = peer.recv().await {
            match std::str::from_utf8(&delivery.payload) {
                Ok(text) => println!("<- seq={} {:?}", delivery.seq, text),
                Err(_) => println!("<- seq={} {:?}", delivery.seq, delivery.payload),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match session.send_text(line).await {
            Ok(outcome) => println!("-> {:?}", outcome),
            Err(e) => eprintln!("send failed: {}", e),
        }
    }

    recv_task.abort();
    let snap = session.metrics().snapshot();
    info!(?snap, "final link counters");
    Ok(())
}

//! UDP offer broadcaster
//!
//! Announces the server's TCP port once per interval for the lifetime of
//! the process. Runs as its own task and shares nothing with game sessions.

use protocol::{Offer, WireMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Bind an ephemeral UDP socket that may send to broadcast addresses.
pub async fn bind_broadcast_socket() -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

/// Send `offer` to `target` every `interval`.
///
/// Send failures are logged and retried on the next tick.
pub async fn run_broadcaster(
    socket: UdpSocket,
    offer: Offer,
    target: SocketAddr,
    interval: Duration,
) {
    let message = offer.to_bytes();
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        match socket.send_to(&message, target).await {
            Ok(_) => debug!("Broadcast offer to {} (tcp port {})", target, offer.tcp_port),
            Err(e) => warn!("Failed to broadcast offer to {}: {}", target, e),
        }
    }
}

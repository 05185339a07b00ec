//! Listening for server offers on the discovery port
//!
//! Several clients on one host must be able to listen at the same time, so
//! the socket is built with socket2 to set address/port reuse before bind.
//! Anything on the port that is not a well-formed Offer is dropped.

use crate::config::DiscoveryConfig;
use protocol::{Offer, WireMessage};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to bind discovery socket on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("No offer received after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("Receive failed: {0}")]
    Recv(std::io::Error),
}

/// A server that announced itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOffer {
    /// Sender IP with the advertised TCP port
    pub addr: SocketAddr,
    pub name: String,
}

/// Bind a shared, broadcast-capable UDP socket on `port`.
pub fn bind_listener(port: u16) -> Result<UdpSocket, DiscoveryError> {
    let bind_err = |source| DiscoveryError::Bind { port, source };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    #[cfg(unix)]
    socket.set_reuse_port(true).map_err(bind_err)?;
    socket.set_broadcast(true).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into()).map_err(bind_err)?;

    UdpSocket::from_std(socket.into()).map_err(bind_err)
}

/// Wait up to `deadline` for one valid offer.
///
/// Returns `Ok(None)` when the deadline passes quietly.
pub async fn wait_for_offer(
    socket: &UdpSocket,
    deadline: Duration,
) -> Result<Option<ServerOffer>, DiscoveryError> {
    let mut buf = [0u8; 1024];

    let receive = async {
        loop {
            let (len, src) = socket.recv_from(&mut buf).await.map_err(DiscoveryError::Recv)?;
            match Offer::from_bytes(&buf[..len]) {
                Ok(offer) => {
                    return Ok(ServerOffer {
                        addr: SocketAddr::new(src.ip(), offer.tcp_port),
                        name: offer.server_name,
                    });
                }
                Err(e) => debug!("Ignoring datagram from {}: {}", src, e),
            }
        }
    };

    match tokio::time::timeout(deadline, receive).await {
        Ok(result) => result.map(Some),
        Err(_) => Ok(None),
    }
}

/// Listen until a server announces itself, retrying per `config`.
pub async fn discover(config: &DiscoveryConfig) -> Result<ServerOffer, DiscoveryError> {
    let socket = bind_listener(config.port)?;
    info!("Client started, listening for offer requests on UDP port {}...", config.port);

    let mut attempts = 0;
    loop {
        attempts += 1;
        if let Some(offer) = wait_for_offer(&socket, config.timeout()).await? {
            info!("Received offer from {} at {}", offer.name, offer.addr);
            return Ok(offer);
        }

        if config.max_attempts != 0 && attempts >= config.max_attempts {
            return Err(DiscoveryError::Timeout { attempts });
        }
        warn!(
            "No offer within {:?} (attempt {}), retrying in {:?}",
            config.timeout(),
            attempts,
            config.retry_delay()
        );
        tokio::time::sleep(config.retry_delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn listener() -> (UdpSocket, SocketAddr) {
        let socket = bind_listener(0).unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, SocketAddr::from((Ipv4Addr::LOCALHOST, port)))
    }

    #[tokio::test]
    async fn test_offer_after_noise() {
        let (socket, target) = listener().await;
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        sender.send_to(b"not an offer", target).await.unwrap();
        let mut corrupted = Offer::new(1, "Fake").to_bytes();
        corrupted[0] = 0;
        sender.send_to(&corrupted, target).await.unwrap();
        sender
            .send_to(&Offer::new(5555, "Table One").to_bytes(), target)
            .await
            .unwrap();

        let offer = wait_for_offer(&socket, Duration::from_secs(2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(offer.addr, SocketAddr::from((Ipv4Addr::LOCALHOST, 5555)));
        assert_eq!(offer.name, "Table One");
    }

    #[tokio::test]
    async fn test_quiet_port_times_out() {
        let (socket, _) = listener().await;
        let offer = wait_for_offer(&socket, Duration::from_millis(50)).await.unwrap();
        assert_eq!(offer, None);
    }

    #[tokio::test]
    async fn test_discover_gives_up_after_max_attempts() {
        let (socket, _) = listener().await;
        let port = socket.local_addr().unwrap().port();
        let config = DiscoveryConfig {
            port,
            timeout_sec: 1,
            max_attempts: 1,
            retry_delay_ms: 10,
        };

        assert!(matches!(
            discover(&config).await,
            Err(DiscoveryError::Timeout { attempts: 1 })
        ));
    }

    #[tokio::test]
    async fn test_two_listeners_share_port() {
        let (first, _) = listener().await;
        let port = first.local_addr().unwrap().port();
        assert!(bind_listener(port).is_ok());
    }
}

//! Blackjack Server - offer broadcaster and game sessions

mod broadcast;
mod config;
mod handlers;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use protocol::Offer;
use session::SessionManager;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket as StdUdpSocket};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author = "Florian Schüller <schuellerf@gmail.com>")]
#[command(version)]
#[command(
    about = "Blackjack server - announces itself over UDP and deals over TCP",
    long_about = None
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "server.conf")]
    config: String,

    /// Table name advertised in offers (overrides the config file)
    #[arg(short, long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = config::Config::load(&args.config)
        .context("Failed to load configuration")?;
    if let Some(name) = args.name {
        config.general.server_name = name;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting Blackjack server v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", args.config);

    let bind_addr = format!("{}:{}", config.general.bind_address, config.general.tcp_port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .context(format!("Failed to bind to {}", bind_addr))?;
    let tcp_port = listener.local_addr()?.port();

    info!(
        "Server '{}' started, listening on IP address {} (tcp port {})",
        config.general.server_name,
        local_ip(),
        tcp_port
    );

    let socket = broadcast::bind_broadcast_socket()
        .await
        .context("Failed to open broadcast socket")?;
    let target = SocketAddr::new(
        IpAddr::V4(config.discovery.broadcast_address),
        config.discovery.port,
    );
    let offer = Offer::new(tcp_port, &config.general.server_name);
    info!(
        "Broadcasting offers to {} every {} ms",
        target, config.discovery.interval_ms
    );
    tokio::spawn(broadcast::run_broadcaster(
        socket,
        offer,
        target,
        Duration::from_millis(config.discovery.interval_ms),
    ));

    let manager = SessionManager::new(config.session.clone());
    let stats = manager.stats();

    tokio::select! {
        _ = manager.run(listener) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            let totals = stats.snapshot();
            info!(
                "Shutting down after {} sessions ({} rounds)",
                totals.sessions_completed + totals.sessions_aborted,
                totals.rounds
            );
        }
    }

    Ok(())
}

/// Address of the interface that routes outward. Connecting a UDP socket sends nothing.
fn local_ip() -> IpAddr {
    StdUdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

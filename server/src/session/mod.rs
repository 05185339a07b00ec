//! Session management for connected players
//!
//! Every accepted TCP connection gets its own task and its own [`Session`].
//! Sessions are never shared between tasks; the only cross-task state is
//! [`ServerStats`], which holds aggregate counters for logging.

use crate::config::SessionConfig;
use crate::handlers;
use protocol::game::Outcome;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Per-connection game state, owned by exactly one worker task
#[derive(Debug)]
pub struct Session {
    pub session_id: u64,
    pub peer: SocketAddr,
    pub stream: TcpStream,
    pub client_name: String,
    pub num_rounds: u8,
    pub round_index: u8,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Session {
    pub fn new(
        session_id: u64,
        peer: SocketAddr,
        stream: TcpStream,
        client_name: String,
        num_rounds: u8,
    ) -> Self {
        Self {
            session_id,
            peer,
            stream,
            client_name,
            num_rounds,
            round_index: 0,
            wins: 0,
            losses: 0,
            ties: 0,
        }
    }

    /// Record a finished round (player's perspective).
    pub fn record(&mut self, outcome: Outcome) {
        self.round_index += 1;
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Tie => self.ties += 1,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.round_index >= self.num_rounds
    }
}

/// Aggregate counters across all sessions, from the dealer's side
#[derive(Debug, Default)]
pub struct ServerStats {
    sessions_completed: AtomicU64,
    sessions_aborted: AtomicU64,
    rounds: AtomicU64,
    dealer_wins: AtomicU64,
    dealer_losses: AtomicU64,
    ties: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sessions_completed: u64,
    pub sessions_aborted: u64,
    pub rounds: u64,
    pub dealer_wins: u64,
    pub dealer_losses: u64,
    pub ties: u64,
}

impl ServerStats {
    /// Fold in a session's rounds. The player's losses are the dealer's wins.
    pub fn record_session(&self, session: &Session) {
        let played = u64::from(session.round_index);
        self.rounds.fetch_add(played, Ordering::Relaxed);
        self.dealer_wins.fetch_add(u64::from(session.losses), Ordering::Relaxed);
        self.dealer_losses.fetch_add(u64::from(session.wins), Ordering::Relaxed);
        self.ties.fetch_add(u64::from(session.ties), Ordering::Relaxed);
        if session.is_complete() {
            self.sessions_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.sessions_aborted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A session that failed before any game state existed
    pub fn record_abort(&self) {
        self.sessions_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_aborted: self.sessions_aborted.load(Ordering::Relaxed),
            rounds: self.rounds.load(Ordering::Relaxed),
            dealer_wins: self.dealer_wins.load(Ordering::Relaxed),
            dealer_losses: self.dealer_losses.load(Ordering::Relaxed),
            ties: self.ties.load(Ordering::Relaxed),
        }
    }
}

/// Session manager: accepts connections and spawns one worker per client
pub struct SessionManager {
    config: SessionConfig,
    stats: Arc<ServerStats>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            stats: Arc::new(ServerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        self.stats.clone()
    }

    /// Accept connections until the task is dropped.
    ///
    /// A failing session never reaches this loop; accept errors are logged
    /// and the loop keeps going.
    pub async fn run(&self, listener: TcpListener) {
        let mut next_session_id: u64 = 1;

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    continue;
                }
            };

            let session_id = next_session_id;
            next_session_id += 1;
            info!("[session {}] New connection from {}", session_id, peer);

            let config = self.config.clone();
            let stats = self.stats.clone();
            tokio::spawn(async move {
                handlers::handle_client(session_id, stream, peer, config, stats).await;
                debug!("[session {}] Worker finished", session_id);
            });
        }
    }
}

//! Per-connection worker: request handshake followed by the round loop

pub mod request;
pub mod round;

pub use request::handle_request;
pub use round::play_round;

use crate::config::SessionConfig;
use crate::session::{ServerStats, Session};
use protocol::GameError;
use protocol::game::Round;
use protocol::io::ReadError;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{error, info, warn};

/// Everything that can end a session early. None of it escapes the worker.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Read(#[from] ReadError),

    #[error("Write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("{0}")]
    Game(#[from] GameError),
}

/// Run one client from Request to connection close.
///
/// The connection is closed when this returns, whatever the outcome.
pub async fn handle_client(
    session_id: u64,
    mut stream: TcpStream,
    peer: SocketAddr,
    config: SessionConfig,
    stats: Arc<ServerStats>,
) {
    let request = match handle_request(&mut stream, config.request_timeout()).await {
        Ok(request) => request,
        Err(e) => {
            warn!("[session {}] Rejected request from {}: {}", session_id, peer, e);
            stats.record_abort();
            return;
        }
    };

    info!(
        "[session {}] {} wants to play {} rounds",
        session_id, request.client_name, request.num_rounds
    );

    let mut session = Session::new(
        session_id,
        peer,
        stream,
        request.client_name,
        request.num_rounds,
    );

    match run_rounds(&mut session, &config).await {
        Ok(()) => {
            info!(
                "[session {}] {} ({}) finished: {}W-{}L-{}T",
                session_id,
                session.client_name,
                session.peer,
                session.wins,
                session.losses,
                session.ties
            );
            // Clean close is the only end-of-session signal the client gets.
            if let Err(e) = session.stream.shutdown().await {
                warn!("[session {}] Failed to close connection: {}", session_id, e);
            }
        }
        Err(SessionError::Game(e)) => {
            error!(
                "[session {}] Aborting in round {}: {}",
                session_id,
                session.round_index + 1,
                e
            );
        }
        Err(e) => {
            warn!(
                "[session {}] Aborted in round {}/{}: {}",
                session_id,
                session.round_index + 1,
                session.num_rounds,
                e
            );
        }
    }

    stats.record_session(&session);
    let totals = stats.snapshot();
    info!(
        "Server stats: {}W-{}L-{}T ({} rounds, {} sessions completed, {} aborted)",
        totals.dealer_wins,
        totals.dealer_losses,
        totals.ties,
        totals.rounds,
        totals.sessions_completed,
        totals.sessions_aborted
    );
}

async fn run_rounds(session: &mut Session, config: &SessionConfig) -> Result<(), SessionError> {
    while !session.is_complete() {
        info!(
            "[session {}] --- Round {}/{} with {} ---",
            session.session_id,
            session.round_index + 1,
            session.num_rounds,
            session.client_name
        );

        let outcome = play_round(
            &mut session.stream,
            session.session_id,
            Round::shuffled(),
            config.decision_timeout(),
        )
        .await?;
        session.record(outcome);

        info!(
            "[session {}] Round {}: {:?} for {}",
            session.session_id, session.round_index, outcome, session.client_name
        );
    }
    Ok(())
}

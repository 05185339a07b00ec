//! Client session driver
//!
//! One call to [`SessionDriver::run_session`] walks the whole lifecycle:
//! discover a server, connect, send the Request, play every round, then wait
//! for the server to hang up. Failures end the session, never the process;
//! the next session starts again from discovery.

mod round;

use crate::config::Config;
use crate::discovery::{self, DiscoveryError};
use crate::output::{self, Statistics};
use crate::strategy::Strategy;
use protocol::io::{ReadError, wait_for_close, write_message};
use protocol::{ProtocolError, Request};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out connecting to {0}")]
    ConnectTimeout(SocketAddr),

    #[error("Invalid request: {0}")]
    Request(#[from] ProtocolError),

    #[error("{0}")]
    Read(#[from] ReadError),

    #[error("Write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("Server closed the connection after {completed} of {requested} rounds")]
    Incomplete { completed: u8, requested: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Discovering,
    Connected,
    Dealing,
    AwaitingDecision,
    DealerTurn,
    RoundEnd,
    SessionComplete,
}

pub struct SessionDriver {
    config: Config,
    strategy: Box<dyn Strategy>,
    state: ClientState,
}

impl SessionDriver {
    pub fn new(config: Config, strategy: Box<dyn Strategy>) -> Self {
        Self {
            config,
            strategy,
            state: ClientState::Disconnected,
        }
    }

    fn transition(&mut self, next: ClientState) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Discover a server and play `num_rounds` against it.
    pub async fn run_session(&mut self, num_rounds: u8) -> Result<Statistics, SessionError> {
        let result = self.discover_and_play(num_rounds).await;
        if let Err(e) = &result {
            warn!("Session failed in state {:?}: {}", self.state, e);
        }
        self.transition(ClientState::Disconnected);
        result
    }

    async fn discover_and_play(&mut self, num_rounds: u8) -> Result<Statistics, SessionError> {
        self.transition(ClientState::Discovering);
        let offer = discovery::discover(&self.config.discovery).await?;
        output::offer(&offer);

        let connect_timeout = self.config.session.connect_timeout();
        let connect = TcpStream::connect(offer.addr);
        let mut stream = match tokio::time::timeout(connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(SessionError::Connect {
                    addr: offer.addr,
                    source,
                });
            }
            Err(_) => return Err(SessionError::ConnectTimeout(offer.addr)),
        };
        info!("Connected to {} at {}", offer.name, offer.addr);

        self.play(&mut stream, num_rounds).await
    }

    /// Play a full session over an already connected stream.
    pub async fn play<S>(
        &mut self,
        stream: &mut S,
        num_rounds: u8,
    ) -> Result<Statistics, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.transition(ClientState::Connected);
        let request = Request::new(num_rounds, self.config.general.client_name.as_str())?;
        write_message(stream, &request).await?;
        info!(
            "Requested {} rounds as {} using {}",
            num_rounds,
            request.client_name,
            self.strategy.name()
        );

        let read_timeout = self.config.session.read_timeout();
        let mut stats = Statistics::default();

        for round_no in 1..=num_rounds {
            output::round_start(round_no, num_rounds);
            let report = match self.play_round(stream, read_timeout).await {
                Ok(report) => report,
                Err(SessionError::Read(ReadError::ConnectionClosed)) => {
                    return Err(SessionError::Incomplete {
                        completed: round_no - 1,
                        requested: num_rounds,
                    });
                }
                Err(e) => return Err(e),
            };

            output::round_result(report.outcome, &report.player, &report.dealer);
            stats.record(report.outcome);
        }

        self.transition(ClientState::SessionComplete);
        match wait_for_close(stream, read_timeout).await {
            Ok(()) => debug!("Server closed the connection"),
            Err(ReadError::TrailingData) => {
                return Err(SessionError::UnexpectedMessage(
                    "data after the final round".to_string(),
                ));
            }
            // All rounds are settled by now.
            Err(e) => warn!("Server did not close the connection: {}", e),
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{DealerMirror, Threshold};
    use protocol::io::read_message;
    use protocol::{Card, Decision, Payload, RoundResult, Suit, WireMessage};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    const DEADLINE: Duration = Duration::from_secs(2);

    fn card(rank: u8, suit: Suit) -> Card {
        Card::new(rank, suit).unwrap()
    }

    fn driver(strategy: Box<dyn Strategy>) -> SessionDriver {
        let mut config = Config::default();
        config.general.client_name = "Tester".to_string();
        config.session.read_timeout_sec = 2;
        SessionDriver::new(config, strategy)
    }

    async fn push(server: &mut DuplexStream, payload: Payload) {
        write_message(server, &payload).await.unwrap();
    }

    async fn expect_request(server: &mut DuplexStream, rounds: u8) {
        let request: Request = read_message(server, DEADLINE).await.unwrap();
        assert_eq!(request.num_rounds, rounds);
        assert_eq!(request.client_name, "Tester");
    }

    async fn expect_decision(server: &mut DuplexStream, expected: Decision) {
        let decision: Decision = read_message(server, DEADLINE).await.unwrap();
        assert_eq!(decision, expected);
    }

    #[tokio::test]
    async fn test_stand_then_dealer_draws_to_21() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            for c in [card(1, Suit::Heart), card(7, Suit::Diamond), card(6, Suit::Club)] {
                push(&mut server, Payload::card(c)).await;
            }
            expect_decision(&mut server, Decision::Stand).await;
            push(&mut server, Payload::card(card(5, Suit::Spade))).await;
            push(&mut server, Payload::card(card(13, Suit::Heart))).await;
            push(&mut server, Payload::result(RoundResult::Loss, None)).await;
        });

        let mut driver = driver(Box::new(DealerMirror));
        let stats = driver.play(&mut client, 1).await.unwrap();
        script.await.unwrap();

        assert_eq!(stats, Statistics { wins: 0, losses: 1, ties: 0 });
        assert_eq!(driver.state, ClientState::SessionComplete);
    }

    #[tokio::test]
    async fn test_hits_until_bust() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            for c in [card(2, Suit::Heart), card(3, Suit::Heart), card(10, Suit::Club)] {
                push(&mut server, Payload::card(c)).await;
            }
            expect_decision(&mut server, Decision::Hit).await;
            push(&mut server, Payload::card(card(10, Suit::Diamond))).await;
            expect_decision(&mut server, Decision::Hit).await;
            push(&mut server, Payload::result(RoundResult::Loss, Some(card(9, Suit::Club)))).await;
        });

        let stats = driver(Box::new(DealerMirror)).play(&mut client, 1).await.unwrap();
        script.await.unwrap();
        assert_eq!(stats.losses, 1);
    }

    #[tokio::test]
    async fn test_two_aces_need_no_decision() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            for c in [card(1, Suit::Heart), card(1, Suit::Spade), card(9, Suit::Club)] {
                push(&mut server, Payload::card(c)).await;
            }
            push(&mut server, Payload::result(RoundResult::Loss, None)).await;
            server.shutdown().await.unwrap();

            // The client must not have sent a decision.
            let mut rest = Vec::new();
            server.read_to_end(&mut rest).await.unwrap();
            rest
        });

        let stats = driver(Box::new(Threshold(30))).play(&mut client, 1).await.unwrap();
        drop(client);
        assert!(script.await.unwrap().is_empty());
        assert_eq!(stats.losses, 1);
    }

    #[tokio::test]
    async fn test_two_rounds_win_and_tie() {
        let (mut client, mut server) = duplex(512);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 2).await;

            for c in [card(10, Suit::Heart), card(9, Suit::Heart), card(10, Suit::Club)] {
                push(&mut server, Payload::card(c)).await;
            }
            expect_decision(&mut server, Decision::Stand).await;
            push(&mut server, Payload::card(card(6, Suit::Club))).await;
            push(&mut server, Payload::card(card(12, Suit::Diamond))).await;
            push(&mut server, Payload::result(RoundResult::Win, None)).await;

            for c in [card(10, Suit::Spade), card(8, Suit::Spade), card(10, Suit::Diamond)] {
                push(&mut server, Payload::card(c)).await;
            }
            expect_decision(&mut server, Decision::Stand).await;
            push(&mut server, Payload::card(card(8, Suit::Club))).await;
            push(&mut server, Payload::result(RoundResult::Tie, None)).await;
        });

        let stats = driver(Box::new(DealerMirror)).play(&mut client, 2).await.unwrap();
        script.await.unwrap();
        assert_eq!(stats, Statistics { wins: 1, losses: 0, ties: 1 });
    }

    #[tokio::test]
    async fn test_close_mid_session_is_incomplete() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 3).await;
            for c in [card(10, Suit::Heart), card(9, Suit::Heart), card(10, Suit::Club)] {
                push(&mut server, Payload::card(c)).await;
            }
            expect_decision(&mut server, Decision::Stand).await;
            push(&mut server, Payload::card(card(8, Suit::Club))).await;
            push(&mut server, Payload::result(RoundResult::Win, None)).await;
            push(&mut server, Payload::card(card(2, Suit::Club))).await;
        });

        let result = driver(Box::new(DealerMirror)).play(&mut client, 3).await;
        script.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Incomplete { completed: 1, requested: 3 })
        ));
    }

    #[tokio::test]
    async fn test_corrupted_payload_aborts() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            let mut bytes = Payload::card(card(4, Suit::Heart)).to_bytes();
            bytes[4] = 0x03;
            server.write_all(&bytes).await.unwrap();
            server
        });

        let result = driver(Box::new(DealerMirror)).play(&mut client, 1).await;
        let _server = script.await.unwrap();
        assert!(matches!(
            result,
            Err(SessionError::Read(ReadError::Protocol(ProtocolError::InvalidMessageType { .. })))
        ));
    }

    #[tokio::test]
    async fn test_result_during_deal_is_accepted() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            push(&mut server, Payload::card(card(1, Suit::Heart))).await;
            push(&mut server, Payload::card(card(13, Suit::Heart))).await;
            push(&mut server, Payload::result(RoundResult::Win, Some(card(5, Suit::Club)))).await;
        });

        let stats = driver(Box::new(DealerMirror)).play(&mut client, 1).await.unwrap();
        script.await.unwrap();
        assert_eq!(stats.wins, 1);
    }

    #[tokio::test]
    async fn test_continue_without_card_is_unexpected() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            push(&mut server, Payload::result(RoundResult::NotOver, None)).await;
            server
        });

        let result = driver(Box::new(DealerMirror)).play(&mut client, 1).await;
        let _server = script.await.unwrap();
        assert!(matches!(result, Err(SessionError::UnexpectedMessage(_))));
    }

    #[tokio::test]
    async fn test_repeated_card_is_unexpected() {
        let (mut client, mut server) = duplex(512);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            for c in [card(10, Suit::Heart), card(9, Suit::Heart), card(10, Suit::Club)] {
                push(&mut server, Payload::card(c)).await;
            }
            expect_decision(&mut server, Decision::Stand).await;
            for _ in 0..3 {
                push(&mut server, Payload::card(card(13, Suit::Spade))).await;
            }
            push(&mut server, Payload::result(RoundResult::Win, None)).await;
            server
        });

        let mut driver = driver(Box::new(DealerMirror));
        let result = driver.play(&mut client, 1).await;
        let _server = script.await.unwrap();
        assert!(matches!(result, Err(SessionError::UnexpectedMessage(_))));
        assert_eq!(driver.state, ClientState::DealerTurn);
    }

    #[tokio::test]
    async fn test_repeated_card_in_deal_is_unexpected() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            for c in [card(4, Suit::Heart), card(4, Suit::Heart), card(10, Suit::Club)] {
                push(&mut server, Payload::card(c)).await;
            }
            server
        });

        let result = driver(Box::new(DealerMirror)).play(&mut client, 1).await;
        let _server = script.await.unwrap();
        assert!(matches!(result, Err(SessionError::UnexpectedMessage(_))));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let (mut client, mut server) = duplex(256);
        let script = tokio::spawn(async move {
            expect_request(&mut server, 1).await;
            push(&mut server, Payload::card(card(10, Suit::Heart))).await;
            server
        });

        let mut driver = driver(Box::new(DealerMirror));
        driver.config.session.read_timeout_sec = 1;
        let result = driver.play(&mut client, 1).await;
        let _server = script.await.unwrap();

        assert!(matches!(result, Err(SessionError::Read(ReadError::Timeout(_)))));
        assert_eq!(driver.state, ClientState::Dealing);
    }

    #[tokio::test]
    async fn test_failed_session_returns_to_disconnected() {
        let mut driver = driver(Box::new(DealerMirror));
        driver.config.discovery = crate::config::DiscoveryConfig {
            port: 0,
            timeout_sec: 1,
            max_attempts: 1,
            retry_delay_ms: 10,
        };

        let result = driver.run_session(1).await;
        assert!(matches!(
            result,
            Err(SessionError::Discovery(DiscoveryError::Timeout { attempts: 1 }))
        ));
        assert_eq!(driver.state, ClientState::Disconnected);

        // The driver is reusable for the next session.
        assert!(driver.run_session(1).await.is_err());
        assert_eq!(driver.state, ClientState::Disconnected);
    }
}

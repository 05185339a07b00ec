//! Round handler: deal, decision loop, dealer turn, result
//!
//! The stream carries two flows in a fixed order. The server pushes cards
//! the client never asked for (the deal, the dealer's cards, the result),
//! and it replies exactly once to each Hit. A Stand gets no reply of its
//! own; it hands the turn to the dealer.

use super::SessionError;
use protocol::game::{Outcome, Round};
use protocol::io::{read_message, write_message};
use protocol::{Card, Decision, Payload};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

/// Where the round is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Dealing,
    AwaitingDecision,
    DealerTurn,
    Finished {
        outcome: Outcome,
        /// Card that ended the round, sent along with the result
        last_card: Option<Card>,
        flow: Flow,
    },
}

/// Why a payload goes out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Server-initiated, no response expected
    Push,
    /// Answer to the client's Hit
    Reply,
}

async fn send<S>(
    stream: &mut S,
    session_id: u64,
    flow: Flow,
    payload: Payload,
) -> Result<(), SessionError>
where
    S: AsyncWrite + Unpin,
{
    debug!("[session {}] {:?} {:?}", session_id, flow, payload);
    write_message(stream, &payload).await?;
    Ok(())
}

/// Play one round over `stream`, returning the player's outcome.
pub async fn play_round<S>(
    stream: &mut S,
    session_id: u64,
    mut round: Round,
    decision_timeout: Duration,
) -> Result<Outcome, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut phase = Phase::Dealing;
    let mut hole_card = None;

    loop {
        phase = match phase {
            Phase::Dealing => {
                let deal = round.deal()?;
                hole_card = Some(deal.dealer_hole);
                info!(
                    "[session {}] Player: {} | Dealer shows {} (hidden {})",
                    session_id,
                    round.player(),
                    deal.dealer_up,
                    deal.dealer_hole
                );

                for card in [deal.player[0], deal.player[1], deal.dealer_up] {
                    send(stream, session_id, Flow::Push, Payload::card(card)).await?;
                }

                if round.player().is_bust() {
                    Phase::Finished {
                        outcome: Outcome::Loss,
                        last_card: None,
                        flow: Flow::Push,
                    }
                } else {
                    Phase::AwaitingDecision
                }
            }

            Phase::AwaitingDecision => {
                let decision: Decision = read_message(stream, decision_timeout).await?;
                debug!("[session {}] Player chose {}", session_id, decision);

                match decision {
                    Decision::Stand => Phase::DealerTurn,
                    Decision::Hit => {
                        let card = round.hit_player()?;
                        info!(
                            "[session {}] Player drew {} -> {}",
                            session_id,
                            card,
                            round.player()
                        );

                        if round.player().is_bust() {
                            Phase::Finished {
                                outcome: Outcome::Loss,
                                last_card: Some(card),
                                flow: Flow::Reply,
                            }
                        } else {
                            send(stream, session_id, Flow::Reply, Payload::card(card)).await?;
                            Phase::AwaitingDecision
                        }
                    }
                }
            }

            Phase::DealerTurn => {
                if let Some(card) = hole_card.take() {
                    send(stream, session_id, Flow::Push, Payload::card(card)).await?;
                }
                while let Some(card) = round.dealer_step()? {
                    info!("[session {}] Dealer drew {} -> {}", session_id, card, round.dealer());
                    send(stream, session_id, Flow::Push, Payload::card(card)).await?;
                }

                Phase::Finished {
                    outcome: round.outcome(),
                    last_card: None,
                    flow: Flow::Push,
                }
            }

            Phase::Finished {
                outcome,
                last_card,
                flow,
            } => {
                info!(
                    "[session {}] Final: Player {} vs Dealer {} -> {:?}",
                    session_id,
                    round.player().total(),
                    round.dealer().total(),
                    outcome
                );
                send(stream, session_id, flow, Payload::result(outcome.into(), last_card)).await?;
                return Ok(outcome);
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::io::ReadError;
    use protocol::{Deck, RoundResult, Suit, WireMessage};
    use tokio::io::{DuplexStream, duplex};

    const DEADLINE: Duration = Duration::from_secs(2);

    fn card(rank: u8, suit: Suit) -> Card {
        Card::new(rank, suit).unwrap()
    }

    fn stacked(cards: &[(u8, Suit)]) -> Round {
        Round::new(Deck::stacked(cards.iter().map(|&(r, s)| card(r, s)).collect()))
    }

    async fn expect_payload(client: &mut DuplexStream) -> Payload {
        read_message(client, DEADLINE).await.unwrap()
    }

    async fn expect_deal(client: &mut DuplexStream, cards: [Card; 3]) {
        for expected in cards {
            assert_eq!(expect_payload(client).await, Payload::card(expected));
        }
    }

    #[tokio::test]
    async fn test_stand_dealer_draws_to_21() {
        let round = stacked(&[
            (1, Suit::Heart),
            (7, Suit::Diamond),
            (6, Suit::Club),
            (5, Suit::Spade),
            (13, Suit::Heart),
        ]);
        let (mut client, mut server) = duplex(256);
        let worker = tokio::spawn(async move { play_round(&mut server, 1, round, DEADLINE).await });

        expect_deal(
            &mut client,
            [card(1, Suit::Heart), card(7, Suit::Diamond), card(6, Suit::Club)],
        )
        .await;
        write_message(&mut client, &Decision::Stand).await.unwrap();

        // Hole card, then the dealer's draw to 21, then the result.
        assert_eq!(expect_payload(&mut client).await, Payload::card(card(5, Suit::Spade)));
        assert_eq!(expect_payload(&mut client).await, Payload::card(card(13, Suit::Heart)));
        let result = expect_payload(&mut client).await;
        assert_eq!(result.result, RoundResult::Loss);
        assert_eq!(result.to_bytes()[5], 2);
        assert_eq!(result.card, None);

        assert_eq!(worker.await.unwrap().unwrap(), Outcome::Loss);
    }

    #[tokio::test]
    async fn test_bust_on_third_card_skips_dealer_turn() {
        let round = stacked(&[
            (9, Suit::Heart),
            (8, Suit::Diamond),
            (10, Suit::Spade),
            (6, Suit::Spade),
            (10, Suit::Club),
        ]);
        let (mut client, mut server) = duplex(256);
        let worker = tokio::spawn(async move {
            let outcome = play_round(&mut server, 1, round, DEADLINE).await;
            (outcome, server)
        });

        expect_deal(
            &mut client,
            [card(9, Suit::Heart), card(8, Suit::Diamond), card(10, Suit::Spade)],
        )
        .await;
        write_message(&mut client, &Decision::Hit).await.unwrap();

        assert_eq!(
            expect_payload(&mut client).await,
            Payload::result(RoundResult::Loss, Some(card(10, Suit::Club)))
        );

        let (outcome, server) = worker.await.unwrap();
        assert_eq!(outcome.unwrap(), Outcome::Loss);

        // Nothing else was sent for this round.
        drop(server);
        assert!(matches!(
            read_message::<Payload, _>(&mut client, DEADLINE).await,
            Err(ReadError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_hit_then_stand_player_wins_on_dealer_bust() {
        let round = stacked(&[
            (2, Suit::Heart),
            (3, Suit::Heart),
            (10, Suit::Club),
            (6, Suit::Club),
            (10, Suit::Diamond),
            (13, Suit::Spade),
        ]);
        let (mut client, mut server) = duplex(256);
        let worker = tokio::spawn(async move { play_round(&mut server, 1, round, DEADLINE).await });

        expect_deal(
            &mut client,
            [card(2, Suit::Heart), card(3, Suit::Heart), card(10, Suit::Club)],
        )
        .await;
        write_message(&mut client, &Decision::Hit).await.unwrap();
        assert_eq!(expect_payload(&mut client).await, Payload::card(card(10, Suit::Diamond)));
        write_message(&mut client, &Decision::Stand).await.unwrap();

        assert_eq!(expect_payload(&mut client).await, Payload::card(card(6, Suit::Club)));
        assert_eq!(expect_payload(&mut client).await, Payload::card(card(13, Suit::Spade)));
        assert_eq!(
            expect_payload(&mut client).await,
            Payload::result(RoundResult::Win, None)
        );
        assert_eq!(worker.await.unwrap().unwrap(), Outcome::Win);
    }

    #[tokio::test]
    async fn test_natural_21_still_waits_for_decision() {
        let round = stacked(&[
            (1, Suit::Heart),
            (13, Suit::Heart),
            (10, Suit::Club),
            (7, Suit::Club),
        ]);
        let (mut client, mut server) = duplex(256);
        let worker = tokio::spawn(async move { play_round(&mut server, 1, round, DEADLINE).await });

        expect_deal(
            &mut client,
            [card(1, Suit::Heart), card(13, Suit::Heart), card(10, Suit::Club)],
        )
        .await;
        write_message(&mut client, &Decision::Stand).await.unwrap();
        assert_eq!(expect_payload(&mut client).await, Payload::card(card(7, Suit::Club)));
        assert_eq!(
            expect_payload(&mut client).await,
            Payload::result(RoundResult::Win, None)
        );
        assert_eq!(worker.await.unwrap().unwrap(), Outcome::Win);
    }

    #[tokio::test]
    async fn test_two_aces_settled_on_deal() {
        let round = stacked(&[
            (1, Suit::Heart),
            (1, Suit::Spade),
            (10, Suit::Club),
            (7, Suit::Club),
        ]);
        let (mut client, mut server) = duplex(256);
        let worker = tokio::spawn(async move { play_round(&mut server, 1, round, DEADLINE).await });

        expect_deal(
            &mut client,
            [card(1, Suit::Heart), card(1, Suit::Spade), card(10, Suit::Club)],
        )
        .await;
        assert_eq!(
            expect_payload(&mut client).await,
            Payload::result(RoundResult::Loss, None)
        );
        assert_eq!(worker.await.unwrap().unwrap(), Outcome::Loss);
    }

    #[tokio::test]
    async fn test_invalid_decision_aborts() {
        let round = stacked(&[
            (2, Suit::Heart),
            (3, Suit::Heart),
            (4, Suit::Club),
            (5, Suit::Club),
        ]);
        let (mut client, mut server) = duplex(256);
        let worker = tokio::spawn(async move { play_round(&mut server, 1, round, DEADLINE).await });

        expect_deal(
            &mut client,
            [card(2, Suit::Heart), card(3, Suit::Heart), card(4, Suit::Club)],
        )
        .await;
        let mut bytes = Decision::Hit.to_bytes();
        bytes[5..].copy_from_slice(b"Hitt\0");
        tokio::io::AsyncWriteExt::write_all(&mut client, &bytes).await.unwrap();

        assert!(matches!(
            worker.await.unwrap(),
            Err(SessionError::Read(ReadError::Protocol(_)))
        ));
    }

    #[tokio::test]
    async fn test_exhausted_deck_aborts() {
        let round = stacked(&[(2, Suit::Heart), (3, Suit::Heart), (4, Suit::Club)]);
        let (_client, mut server) = duplex(256);
        let result = play_round(&mut server, 1, round, DEADLINE).await;
        assert!(matches!(result, Err(SessionError::Game(protocol::GameError::DeckExhausted))));
    }
}

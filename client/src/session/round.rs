//! One round from the player's seat
//!
//! Totals are mirrored from the cards the server sends; the server's result
//! code is the only verdict. The decision strategy runs only while the
//! player's hand can still act.

use super::{ClientState, SessionDriver, SessionError};
use crate::output;
use crate::strategy::TableView;
use protocol::game::Outcome;
use protocol::io::{read_message, write_message};
use protocol::{Card, Decision, Hand, Payload};
use std::collections::HashSet;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub(super) struct RoundReport {
    pub outcome: Outcome,
    pub player: Hand,
    pub dealer: Hand,
}

enum Received {
    Card(Card),
    Final(Outcome, Option<Card>),
}

/// Read the next payload of the round.
///
/// Every card is checked against `seen`: one deck never deals the same card
/// twice, which also bounds a round at 52 cards.
async fn receive<S>(
    stream: &mut S,
    deadline: Duration,
    seen: &mut HashSet<Card>,
) -> Result<Received, SessionError>
where
    S: AsyncRead + Unpin,
{
    let payload: Payload = read_message(stream, deadline).await?;
    debug!("Received {:?}", payload);

    if let Some(card) = payload.card {
        if !seen.insert(card) {
            return Err(SessionError::UnexpectedMessage(format!(
                "card {} dealt twice in one round",
                card
            )));
        }
    }

    match Outcome::try_from(payload.result) {
        Ok(outcome) => Ok(Received::Final(outcome, payload.card)),
        Err(_) => payload.card.map(Received::Card).ok_or_else(|| {
            SessionError::UnexpectedMessage("round continues but no card was sent".to_string())
        }),
    }
}

impl SessionDriver {
    pub(super) async fn play_round<S>(
        &mut self,
        stream: &mut S,
        read_timeout: Duration,
    ) -> Result<RoundReport, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut player = Hand::new();
        let mut dealer = Hand::new();
        let mut seen = HashSet::new();

        // Two cards for the player, then the dealer's up-card.
        self.transition(ClientState::Dealing);
        for dealt in 0..3 {
            match receive(stream, read_timeout, &mut seen).await? {
                Received::Card(card) if dealt < 2 => {
                    player.push(card);
                    output::player_card(card, &player);
                }
                Received::Card(card) => {
                    dealer.push(card);
                    output::dealer_card(card, &dealer);
                }
                Received::Final(outcome, card) => {
                    if let Some(card) = card {
                        if dealt < 2 {
                            player.push(card);
                        } else {
                            dealer.push(card);
                        }
                    }
                    return Ok(self.end_round(outcome, player, dealer));
                }
            }
        }

        if player.is_bust() {
            return match receive(stream, read_timeout, &mut seen).await? {
                Received::Final(outcome, _) => Ok(self.end_round(outcome, player, dealer)),
                Received::Card(card) => Err(SessionError::UnexpectedMessage(format!(
                    "card {} dealt to a hand that is already bust",
                    card
                ))),
            };
        }

        self.transition(ClientState::AwaitingDecision);
        loop {
            let view = TableView {
                player: &player,
                dealer: dealer.cards(),
            };
            let decision = self.strategy.decide(&view);
            output::decision(decision, &player);
            write_message(stream, &decision).await?;

            if decision == Decision::Stand {
                break;
            }

            match receive(stream, read_timeout, &mut seen).await? {
                Received::Card(card) => {
                    player.push(card);
                    output::player_card(card, &player);
                    if player.is_bust() {
                        return Err(SessionError::UnexpectedMessage(format!(
                            "round continues at bust total {}",
                            player.total()
                        )));
                    }
                }
                Received::Final(outcome, card) => {
                    if let Some(card) = card {
                        player.push(card);
                        output::player_card(card, &player);
                    }
                    return Ok(self.end_round(outcome, player, dealer));
                }
            }
        }

        self.transition(ClientState::DealerTurn);
        loop {
            match receive(stream, read_timeout, &mut seen).await? {
                Received::Card(card) => {
                    dealer.push(card);
                    output::dealer_card(card, &dealer);
                }
                Received::Final(outcome, card) => {
                    if let Some(card) = card {
                        dealer.push(card);
                        output::dealer_card(card, &dealer);
                    }
                    return Ok(self.end_round(outcome, player, dealer));
                }
            }
        }
    }

    fn end_round(&mut self, outcome: Outcome, player: Hand, dealer: Hand) -> RoundReport {
        self.transition(ClientState::RoundEnd);
        RoundReport {
            outcome,
            player,
            dealer,
        }
    }
}

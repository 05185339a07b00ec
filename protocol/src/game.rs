//! Round logic: dealing, dealer auto-play and winner determination
//!
//! Pure game state with no I/O. The server drives a [`Round`] and pushes
//! every card it returns to the client; the client only mirrors totals.

use crate::cards::{Card, Deck, Hand};
use crate::constants::{BUST_THRESHOLD, DEALER_STAND_THRESHOLD};
use crate::error::GameError;
use crate::messages::RoundResult;

/// Round outcome from the player's side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Tie,
}

impl From<Outcome> for RoundResult {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Win => RoundResult::Win,
            Outcome::Loss => RoundResult::Loss,
            Outcome::Tie => RoundResult::Tie,
        }
    }
}

impl TryFrom<RoundResult> for Outcome {
    type Error = RoundResult;

    fn try_from(result: RoundResult) -> Result<Self, Self::Error> {
        match result {
            RoundResult::Win => Ok(Outcome::Win),
            RoundResult::Loss => Ok(Outcome::Loss),
            RoundResult::Tie => Ok(Outcome::Tie),
            RoundResult::NotOver => Err(result),
        }
    }
}

/// The dealer hits below 17 and stands otherwise. Not configurable.
pub fn dealer_should_hit(total: u32) -> bool {
    total < DEALER_STAND_THRESHOLD
}

/// Decide a finished round from both totals.
///
/// A player bust loses regardless of the dealer; a dealer bust then wins
/// for the player; otherwise the higher total wins.
pub fn determine_outcome(player_total: u32, dealer_total: u32) -> Outcome {
    if player_total > BUST_THRESHOLD {
        Outcome::Loss
    } else if dealer_total > BUST_THRESHOLD {
        Outcome::Win
    } else if player_total > dealer_total {
        Outcome::Win
    } else if player_total < dealer_total {
        Outcome::Loss
    } else {
        Outcome::Tie
    }
}

/// Cards dealt at the start of a round, in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialDeal {
    pub player: [Card; 2],
    pub dealer_up: Card,
    pub dealer_hole: Card,
}

/// One deal-through-result cycle
#[derive(Debug)]
pub struct Round {
    deck: Deck,
    player: Hand,
    dealer: Hand,
}

impl Round {
    pub fn new(deck: Deck) -> Self {
        Self {
            deck,
            player: Hand::new(),
            dealer: Hand::new(),
        }
    }

    /// Round with a freshly shuffled deck
    pub fn shuffled() -> Self {
        Self::new(Deck::shuffled())
    }

    pub fn player(&self) -> &Hand {
        &self.player
    }

    pub fn dealer(&self) -> &Hand {
        &self.dealer
    }

    /// Two cards to the player, then two to the dealer.
    pub fn deal(&mut self) -> Result<InitialDeal, GameError> {
        let p1 = self.deck.draw()?;
        let p2 = self.deck.draw()?;
        let d1 = self.deck.draw()?;
        let d2 = self.deck.draw()?;

        self.player.push(p1);
        self.player.push(p2);
        self.dealer.push(d1);
        self.dealer.push(d2);

        Ok(InitialDeal {
            player: [p1, p2],
            dealer_up: d1,
            dealer_hole: d2,
        })
    }

    pub fn hit_player(&mut self) -> Result<Card, GameError> {
        let card = self.deck.draw()?;
        self.player.push(card);
        Ok(card)
    }

    /// Draw one dealer card if the dealer policy requires it.
    ///
    /// Returns `None` once the dealer stands or has bust.
    pub fn dealer_step(&mut self) -> Result<Option<Card>, GameError> {
        if !dealer_should_hit(self.dealer.total()) {
            return Ok(None);
        }
        let card = self.deck.draw()?;
        self.dealer.push(card);
        Ok(Some(card))
    }

    /// Run the dealer to completion, returning the drawn cards.
    pub fn play_dealer(&mut self) -> Result<Vec<Card>, GameError> {
        let mut drawn = Vec::new();
        while let Some(card) = self.dealer_step()? {
            drawn.push(card);
        }
        Ok(drawn)
    }

    pub fn outcome(&self) -> Outcome {
        determine_outcome(self.player.total(), self.dealer.total())
    }
}

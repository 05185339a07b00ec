//! Cards, hands and the 52-card deck

use crate::constants::BUST_THRESHOLD;
use crate::error::{GameError, ProtocolError};
use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;

/// Card suits in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Suit {
    Heart = 0,
    Diamond = 1,
    Club = 2,
    Spade = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Heart, Suit::Diamond, Suit::Club, Suit::Spade];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Suit::Heart),
            1 => Some(Suit::Diamond),
            2 => Some(Suit::Club),
            3 => Some(Suit::Spade),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Suit::Heart => "♥",
            Suit::Diamond => "♦",
            Suit::Club => "♣",
            Suit::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// A playing card. Rank 1 is the Ace, 11-13 are Jack, Queen, King.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    rank: u8,
    suit: Suit,
}

impl Card {
    /// Encoded size: two ASCII rank digits plus the suit byte
    pub const WIRE_SIZE: usize = 3;

    /// Encoding used when a payload carries no card
    pub const NO_CARD: [u8; 3] = *b"000";

    /// Returns `None` unless `rank` is in 1..=13.
    pub fn new(rank: u8, suit: Suit) -> Option<Self> {
        (1..=13).contains(&rank).then_some(Self { rank, suit })
    }

    /// Blackjack value. The Ace always counts 11.
    pub fn value(&self) -> u32 {
        match self.rank {
            1 => 11,
            11..=13 => 10,
            r => u32::from(r),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        [b'0' + self.rank / 10, b'0' + self.rank % 10, self.suit.to_u8()]
    }

    /// Decode a wire card. Rank `"00"` is the no-card placeholder and yields `None`.
    pub fn from_bytes(bytes: [u8; Self::WIRE_SIZE]) -> Result<Option<Self>, ProtocolError> {
        let invalid = || ProtocolError::InvalidCard(bytes);

        if !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
            return Err(invalid());
        }
        let rank = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
        if rank == 0 {
            return Ok(None);
        }

        let suit = Suit::from_u8(bytes[2]).ok_or_else(invalid)?;
        Card::new(rank, suit).map(Some).ok_or_else(invalid)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank {
            1 => "A".to_string(),
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            r => r.to_string(),
        };
        write!(f, "{rank}{}", self.suit)
    }
}

/// Cards in deal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn total(&self) -> u32 {
        self.cards.iter().map(Card::value).sum()
    }

    pub fn is_bust(&self) -> bool {
        self.total() > BUST_THRESHOLD
    }
}

impl FromIterator<Card> for Hand {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        Self {
            cards: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, card) in self.cards.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{card}")?;
        }
        write!(f, " ({})", self.total())
    }
}

/// A single 52-card deck consumed from the front. Never replenished.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    next: usize,
}

impl Deck {
    pub const SIZE: usize = 52;

    /// All 52 cards, rank-major, unshuffled
    pub fn ordered() -> Self {
        let cards = (1..=13)
            .flat_map(|rank| Suit::ALL.into_iter().map(move |suit| Card { rank, suit }))
            .collect();
        Self { cards, next: 0 }
    }

    pub fn shuffled() -> Self {
        Self::shuffled_with(&mut rand::thread_rng())
    }

    pub fn shuffled_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::ordered();
        deck.cards.shuffle(rng);
        deck
    }

    /// A deck that deals exactly `cards`, in order.
    pub fn stacked(cards: Vec<Card>) -> Self {
        Self { cards, next: 0 }
    }

    pub fn draw(&mut self) -> Result<Card, GameError> {
        let card = *self.cards.get(self.next).ok_or(GameError::DeckExhausted)?;
        self.next += 1;
        Ok(card)
    }
}

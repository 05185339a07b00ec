//! Blackjack Protocol Library
//!
//! Shared protocol definitions for Blackjack client-server communication.
//! This includes wire constants, the four message forms, card/deck/round
//! logic and a deadline-bounded reader for fixed-size TCP messages.

pub mod cards;
pub mod constants;
pub mod error;
pub mod game;
pub mod io;
pub mod messages;

pub use cards::{Card, Deck, Hand, Suit};
pub use constants::*;
pub use error::{GameError, ProtocolError};
pub use messages::{Decision, Offer, Payload, Request, RoundResult, WireMessage};

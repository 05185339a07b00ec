//! Protocol constants and message type definitions

/// Magic cookie carried by every message: 0xABCDDCBA
pub const MAGIC_COOKIE: u32 = 0xABCD_DCBA;

/// UDP port servers broadcast offers to
pub const DISCOVERY_PORT: u16 = 13122;

/// Fixed width of the name fields in Offer and Request
pub const NAME_LEN: usize = 32;

/// Hand totals above this are bust
pub const BUST_THRESHOLD: u32 = 21;

/// Dealer draws while below this total
pub const DEALER_STAND_THRESHOLD: u32 = 17;

/// Message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Server announcement (UDP)
    Offer = 0x02,

    /// Session request (TCP, client to server)
    Request = 0x03,

    /// Decision or card/result (TCP, both directions)
    Payload = 0x04,
}

impl MessageType {
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

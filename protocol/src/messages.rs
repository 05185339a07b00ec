//! Blackjack wire messages
//!
//! Every message starts with the 4-byte magic cookie (big-endian) and a
//! 1-byte message type, followed by a fixed body. Decoding checks the total
//! length, then the cookie, then the type, before looking at any field.
//!
//! | Message  | Type | Body                                         | Size |
//! |----------|------|----------------------------------------------|------|
//! | Offer    | 0x02 | tcp_port (u16 BE) + server_name (32)         | 39   |
//! | Request  | 0x03 | num_rounds (u8) + client_name (32)           | 38   |
//! | Decision | 0x04 | "Hittt" or "Stand"                           | 10   |
//! | Payload  | 0x04 | result (u8) + rank ("01".."13") + suit (u8)  | 9    |

use crate::cards::Card;
use crate::constants::{MAGIC_COOKIE, MessageType, NAME_LEN};
use crate::error::ProtocolError;

/// Header size: cookie + type
pub const HEADER_SIZE: usize = 5;

/// A fixed-size protocol message
pub trait WireMessage: Sized {
    /// Exact encoded length
    const SIZE: usize;

    /// Type byte following the cookie
    const TYPE: MessageType;

    fn to_bytes(&self) -> Vec<u8>;

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError>;
}

fn write_header(buf: &mut Vec<u8>, msg_type: MessageType) {
    buf.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
    buf.push(msg_type.to_u8());
}

fn check_header(bytes: &[u8], size: usize, msg_type: MessageType) -> Result<(), ProtocolError> {
    if bytes.len() != size {
        return Err(ProtocolError::InvalidLength {
            expected: size,
            actual: bytes.len(),
        });
    }

    let cookie = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if cookie != MAGIC_COOKIE {
        return Err(ProtocolError::InvalidMagicCookie(cookie));
    }

    if bytes[4] != msg_type.to_u8() {
        return Err(ProtocolError::InvalidMessageType {
            expected: msg_type.to_u8(),
            actual: bytes[4],
        });
    }

    Ok(())
}

/// Longest prefix of `name` that fits the name field without splitting a character.
pub fn truncate_name(name: &str) -> &str {
    if name.len() <= NAME_LEN {
        return name;
    }
    let mut end = NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn write_name(buf: &mut Vec<u8>, name: &str) {
    let name = truncate_name(name).as_bytes();
    buf.extend_from_slice(name);
    buf.resize(buf.len() + NAME_LEN - name.len(), 0);
}

fn read_name(field: &[u8]) -> String {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Server announcement broadcast over UDP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    pub tcp_port: u16,
    pub server_name: String,
}

impl Offer {
    pub fn new(tcp_port: u16, server_name: impl Into<String>) -> Self {
        Self {
            tcp_port,
            server_name: server_name.into(),
        }
    }
}

impl WireMessage for Offer {
    const SIZE: usize = HEADER_SIZE + 2 + NAME_LEN;
    const TYPE: MessageType = MessageType::Offer;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        write_header(&mut bytes, Self::TYPE);
        bytes.extend_from_slice(&self.tcp_port.to_be_bytes());
        write_name(&mut bytes, &self.server_name);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_header(bytes, Self::SIZE, Self::TYPE)?;
        let tcp_port = u16::from_be_bytes([bytes[5], bytes[6]]);
        let server_name = read_name(&bytes[7..]);
        Ok(Self { tcp_port, server_name })
    }
}

/// Opens a game session over TCP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub num_rounds: u8,
    pub client_name: String,
}

impl Request {
    /// Fails for zero rounds.
    pub fn new(num_rounds: u8, client_name: impl Into<String>) -> Result<Self, ProtocolError> {
        if num_rounds == 0 {
            return Err(ProtocolError::InvalidRoundCount(num_rounds));
        }
        Ok(Self {
            num_rounds,
            client_name: client_name.into(),
        })
    }
}

impl WireMessage for Request {
    const SIZE: usize = HEADER_SIZE + 1 + NAME_LEN;
    const TYPE: MessageType = MessageType::Request;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        write_header(&mut bytes, Self::TYPE);
        bytes.push(self.num_rounds);
        write_name(&mut bytes, &self.client_name);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_header(bytes, Self::SIZE, Self::TYPE)?;
        Request::new(bytes[5], read_name(&bytes[6..]))
    }
}

/// Player decision, client to server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Hit,
    Stand,
}

impl Decision {
    const HIT: &'static [u8; 5] = b"Hittt";
    const STAND: &'static [u8; 5] = b"Stand";

    pub fn as_bytes(self) -> &'static [u8; 5] {
        match self {
            Decision::Hit => Self::HIT,
            Decision::Stand => Self::STAND,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Hit => write!(f, "Hit"),
            Decision::Stand => write!(f, "Stand"),
        }
    }
}

impl WireMessage for Decision {
    const SIZE: usize = HEADER_SIZE + 5;
    const TYPE: MessageType = MessageType::Payload;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        write_header(&mut bytes, Self::TYPE);
        bytes.extend_from_slice(self.as_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_header(bytes, Self::SIZE, Self::TYPE)?;
        let mut field = [0u8; 5];
        field.copy_from_slice(&bytes[5..10]);
        match &field {
            Self::HIT => Ok(Decision::Hit),
            Self::STAND => Ok(Decision::Stand),
            _ => Err(ProtocolError::InvalidDecision(field)),
        }
    }
}

/// Round status carried by every server payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RoundResult {
    NotOver = 0x0,
    Tie = 0x1,
    Loss = 0x2,
    Win = 0x3,
}

impl RoundResult {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(RoundResult::NotOver),
            0x1 => Some(RoundResult::Tie),
            0x2 => Some(RoundResult::Loss),
            0x3 => Some(RoundResult::Win),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn is_final(self) -> bool {
        self != RoundResult::NotOver
    }
}

/// Dealt card and/or round result, server to client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub result: RoundResult,
    pub card: Option<Card>,
}

impl Payload {
    /// A dealt card while the round continues
    pub fn card(card: Card) -> Self {
        Self {
            result: RoundResult::NotOver,
            card: Some(card),
        }
    }

    /// The round's closing payload
    pub fn result(result: RoundResult, card: Option<Card>) -> Self {
        Self { result, card }
    }
}

impl WireMessage for Payload {
    const SIZE: usize = HEADER_SIZE + 1 + Card::WIRE_SIZE;
    const TYPE: MessageType = MessageType::Payload;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        write_header(&mut bytes, Self::TYPE);
        bytes.push(self.result.to_u8());
        match self.card {
            Some(card) => bytes.extend_from_slice(&card.to_bytes()),
            None => bytes.extend_from_slice(&Card::NO_CARD),
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        check_header(bytes, Self::SIZE, Self::TYPE)?;
        let result =
            RoundResult::from_u8(bytes[5]).ok_or(ProtocolError::InvalidResult(bytes[5]))?;
        let card = Card::from_bytes([bytes[6], bytes[7], bytes[8]])?;
        Ok(Self { result, card })
    }
}

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Signaling relay errors
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("delivery failed: peer {0} is gone")]
    Delivery(PeerId),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

const PEER_ID_LEN: usize = 13;
const PEER_ID_PREFIX: &[u8] = b"peer_";
const HEX_CHARS: &[u8] = b"0123456789abcdef";

/// Peer ID: 13-byte fixed array ("peer_" + 8 hex)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId {
    bytes: [u8; PEER_ID_LEN],
    len: u8,
}

impl PeerId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; PEER_ID_LEN];
        bytes[..PEER_ID_PREFIX.len()].copy_from_slice(PEER_ID_PREFIX);

        let mut rng = rand::rng();
        let value: u32 = rng.random();

        for i in 0..8 {
            let nibble = ((value >> (28 - i * 4)) & 0xF) as usize;
            bytes[PEER_ID_PREFIX.len() + i] = HEX_CHARS[nibble];
        }
        Self {
            bytes,
            len: PEER_ID_LEN as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keeps at most the first 13 bytes of `s`. Wire input goes through
/// `Deserialize`, which rejects any other length instead.
impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        let mut bytes = [0u8; PEER_ID_LEN];
        let src = s.as_bytes();
        let len = src.len().min(PEER_ID_LEN);
        bytes[..len].copy_from_slice(&src[..len]);
        Self {
            bytes,
            len: len as u8,
        }
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.len() != PEER_ID_LEN {
            return Err(serde::de::Error::invalid_length(
                s.len(),
                &"a 13-byte peer id",
            ));
        }
        Ok(PeerId::from(s.as_str()))
    }
}

/// Room identifier chosen by clients. Any string is accepted, so unlike
/// [`PeerId`] this is heap-backed rather than a fixed array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    /// Create a new outbound message from any string type
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

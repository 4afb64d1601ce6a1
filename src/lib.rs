//! Room-based signaling relay: peers join rooms by name and the relay
//! forwards offers, answers and ICE candidates between room members.

pub mod config;
pub mod signaling;

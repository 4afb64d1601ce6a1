//! WebSocket signaling relay for WebRTC handshakes

mod actor;
mod gateway;
mod messages;
mod registry;
mod router;
mod server;
mod types;

pub use actor::RelayHandle;
pub use gateway::Gateway;
pub use messages::{ClientMessage, ServerMessage};
pub use registry::RoomRegistry;
pub use router::Router;
pub use server::{DEFAULT_SIGNALING_PORT, SignalingServer};
pub use types::{OutboundMessage, PeerId, RoomId, SignalingError};

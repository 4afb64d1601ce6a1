use tokio::sync::mpsc;
use tracing::{debug, info};

use super::gateway::Gateway;
use super::messages::{ClientMessage, ServerMessage};
use super::registry::RoomRegistry;
use super::types::{OutboundMessage, PeerId, RoomId, SignalingError};

/// Routes client messages between room members.
///
/// Owns the gateway and the registry so that a join, a leave and the
/// membership snapshot taken for a broadcast never interleave.
#[derive(Debug, Default)]
pub struct Router {
    gateway: Gateway,
    registry: RoomRegistry,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    #[cfg(test)]
    fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Accept a new connection and greet it with its identity.
    pub fn connect(&mut self, tx: mpsc::UnboundedSender<OutboundMessage>) -> PeerId {
        let peer_id = self.gateway.connect(tx);
        self.deliver(&[peer_id], &ServerMessage::Welcome { peer_id });
        peer_id
    }

    /// Drop a connection and tell every room it was in.
    pub fn disconnect(&mut self, peer_id: PeerId) {
        if !self.gateway.disconnect(peer_id) {
            return;
        }
        for room in self.registry.leave_all(peer_id) {
            self.notify_left(peer_id, &room);
        }
        info!(peer = %peer_id, connected = self.gateway.len(), "peer disconnected");
        if self.gateway.is_empty() {
            debug!("no peers connected");
        }
    }

    /// Handle one message from `sender`. Returns the number of other peers
    /// it was delivered to; the join acknowledgement is not counted.
    pub fn route(&mut self, sender: PeerId, msg: ClientMessage) -> usize {
        match msg {
            ClientMessage::JoinRoom { room_id } => {
                if !self.gateway.is_connected(sender) {
                    debug!(peer = %sender, room = %room_id, "join from unknown peer ignored");
                    return 0;
                }
                self.registry.join(sender, &room_id);
                info!(peer = %sender, room = %room_id, "peer joined room");
                let targets = self.registry.members_except(&room_id, sender);
                self.deliver(
                    &[sender],
                    &ServerMessage::RoomJoined {
                        room_id,
                        peers: targets.clone(),
                    },
                );
                self.deliver(&targets, &ServerMessage::PeerJoined { peer_id: sender })
            }
            ClientMessage::LeaveRoom { room_id } => {
                if !self.registry.leave(sender, &room_id) {
                    return 0;
                }
                info!(peer = %sender, room = %room_id, "peer left room");
                self.notify_left(sender, &room_id)
            }
            ClientMessage::Offer { sdp, room_id } => self.relay(
                sender,
                &room_id,
                ServerMessage::Offer {
                    sdp,
                    peer_id: sender,
                },
            ),
            ClientMessage::Answer { sdp, room_id } => self.relay(
                sender,
                &room_id,
                ServerMessage::Answer {
                    sdp,
                    peer_id: sender,
                },
            ),
            ClientMessage::IceCandidate { candidate, room_id } => self.relay(
                sender,
                &room_id,
                ServerMessage::IceCandidate {
                    candidate,
                    peer_id: sender,
                },
            ),
        }
    }

    fn relay(&self, sender: PeerId, room: &RoomId, msg: ServerMessage) -> usize {
        let targets = self.registry.members_except(room, sender);
        if targets.is_empty() {
            debug!(peer = %sender, room = %room, "no one to relay to");
        }
        self.deliver(&targets, &msg)
    }

    fn notify_left(&self, peer_id: PeerId, room: &RoomId) -> usize {
        let targets = self.registry.members_except(room, peer_id);
        self.deliver(&targets, &ServerMessage::PeerLeft { peer_id })
    }

    /// Best-effort fan-out: failed targets are logged and skipped.
    fn deliver(&self, targets: &[PeerId], msg: &ServerMessage) -> usize {
        if targets.is_empty() {
            return 0;
        }
        let frame = match msg.to_outbound() {
            Ok(frame) => frame,
            Err(e) => {
                debug!("dropping message: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for &target in targets {
            match self.gateway.send(target, frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e @ SignalingError::Delivery(_)) => debug!("{}", e),
                Err(e) => debug!(peer = %target, "send failed: {}", e),
            }
        }
        delivered
    }
}

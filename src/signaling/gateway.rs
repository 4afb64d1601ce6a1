use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::types::{OutboundMessage, PeerId, SignalingError};

/// Live connections and the channels used to push frames to them.
#[derive(Debug, Default)]
pub struct Gateway {
    peers: HashMap<PeerId, mpsc::UnboundedSender<OutboundMessage>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and assign it an identity unique among live peers.
    pub fn connect(&mut self, tx: mpsc::UnboundedSender<OutboundMessage>) -> PeerId {
        let mut peer_id = PeerId::generate();
        while self.peers.contains_key(&peer_id) {
            peer_id = PeerId::generate();
        }
        self.peers.insert(peer_id, tx);
        info!(peer = %peer_id, "peer connected");
        peer_id
    }

    /// Forget a connection. Returns whether it was known.
    pub fn disconnect(&mut self, peer_id: PeerId) -> bool {
        self.peers.remove(&peer_id).is_some()
    }

    /// Queue a frame for one peer.
    ///
    /// # Errors
    ///
    /// [`SignalingError::Delivery`] if the peer is unknown or its writer has
    /// gone away.
    pub fn send(&self, peer_id: PeerId, msg: OutboundMessage) -> Result<(), SignalingError> {
        let tx = self
            .peers
            .get(&peer_id)
            .ok_or(SignalingError::Delivery(peer_id))?;
        tx.send(msg).map_err(|_| {
            debug!(peer = %peer_id, "outbound channel closed");
            SignalingError::Delivery(peer_id)
        })
    }

    pub fn is_connected(&self, peer_id: PeerId) -> bool {
        self.peers.contains_key(&peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

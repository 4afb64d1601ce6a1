use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::messages::ClientMessage;
use super::router::Router;
use super::types::{OutboundMessage, PeerId, SignalingError};

/// Commands sent to the relay actor
pub(crate) enum RelayCommand {
    Connect {
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
        reply: oneshot::Sender<PeerId>,
    },
    Route {
        peer_id: PeerId,
        msg: ClientMessage,
    },
    Disconnect {
        peer_id: PeerId,
    },
    RoomCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Sole owner of the router. Commands are applied one at a time, in the
/// order they were queued.
pub(crate) async fn relay_actor(mut rx: mpsc::Receiver<RelayCommand>) {
    let mut router = Router::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RelayCommand::Connect { peer_tx, reply } => {
                let peer_id = router.connect(peer_tx);
                if reply.send(peer_id).is_err() {
                    // the connection task went away before it learned its id
                    router.disconnect(peer_id);
                }
            }

            RelayCommand::Route { peer_id, msg } => {
                let delivered = router.route(peer_id, msg);
                debug!(peer = %peer_id, delivered, "message routed");
            }

            RelayCommand::Disconnect { peer_id } => {
                router.disconnect(peer_id);
            }

            RelayCommand::RoomCount { reply } => {
                let _ = reply.send(router.registry().room_count());
            }
        }
    }

    info!("relay actor stopped");
}

/// Handle to communicate with the relay actor
#[derive(Clone)]
pub struct RelayHandle {
    pub(crate) tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Spawn a relay actor with the given command queue capacity.
    pub fn spawn(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<RelayCommand>(capacity.max(1));
        tokio::spawn(relay_actor(rx));
        Self { tx }
    }

    /// Register a connection and get its identity
    pub async fn connect(
        &self,
        peer_tx: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<PeerId, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RelayCommand::Connect {
            peer_tx,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    /// Queue a client message for routing
    pub async fn route(&self, peer_id: PeerId, msg: ClientMessage) -> Result<(), SignalingError> {
        self.send(RelayCommand::Route { peer_id, msg }).await
    }

    /// Remove the connection from every room
    pub async fn disconnect(&self, peer_id: PeerId) {
        let _ = self.send(RelayCommand::Disconnect { peer_id }).await;
    }

    /// Number of non-empty rooms
    pub async fn room_count(&self) -> Result<usize, SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RelayCommand::RoomCount { reply: reply_tx })
            .await?;
        reply_rx
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }

    async fn send(&self, cmd: RelayCommand) -> Result<(), SignalingError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SignalingError::Internal("actor channel closed".to_string()))
    }
}

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::RelayHandle;
use super::messages::{ClientMessage, ServerMessage};
use super::types::{OutboundMessage, PeerId, SignalingError};
use crate::config::RelayConfig;

pub const DEFAULT_SIGNALING_PORT: u16 = 3479;

/// Per-connection transport settings taken from [`RelayConfig`].
#[derive(Debug, Clone, Copy)]
struct Keepalive {
    ping_interval: Option<Duration>,
    pong_timeout: Duration,
}

pub struct SignalingServer {
    listener: TcpListener,
    handle: RelayHandle,
    keepalive: Keepalive,
}

impl SignalingServer {
    /// Bind the listener and start the relay actor.
    pub async fn bind(config: &RelayConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        info!(addr = %listener.local_addr()?, "signaling server listening");

        Ok(Self {
            listener,
            handle: RelayHandle::spawn(config.command_queue_capacity),
            keepalive: Keepalive {
                ping_interval: config.ping_interval,
                pong_timeout: config.pong_timeout,
            },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let handle = self.handle.clone();
            let keepalive = self.keepalive;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handle, keepalive).await {
                    error!(%addr, "connection error: {}", e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: RelayHandle,
    keepalive: Keepalive,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    let peer_id = handle.connect(tx.clone()).await?;
    info!(%addr, peer = %peer_id, "websocket connection accepted");

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    let ws_msg = Message::Text(msg.into_inner());
                    if ws_tx.send(ws_msg).await.is_err() {
                        break;
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    let mut ping_interval = keepalive.ping_interval.map(tokio::time::interval);
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        let ping_tick = async {
            match ping_interval.as_mut() {
                Some(interval) => {
                    interval.tick().await;
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = ping_tick => {
                if waiting_for_pong {
                    warn!(peer = %peer_id, "no pong received, disconnecting");
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + keepalive.pong_timeout);
                debug!(peer = %peer_id, "ping sent");
            }

            _ = pong_timeout => {
                warn!(peer = %peer_id, "pong timeout, disconnecting");
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!(peer = %peer_id, "websocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        if let Err(e) = handle_text_message(&text, &tx, &handle, peer_id).await {
                            warn!(peer = %peer_id, "message handling error: {}", e);
                            if matches!(e, SignalingError::Internal(_)) {
                                break;
                            }
                        }
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!(peer = %peer_id, "pong received");
                    }
                    Message::Close(_) => {
                        info!(peer = %peer_id, "close received");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    handle.disconnect(peer_id).await;

    send_task.abort();
    info!(%addr, peer = %peer_id, "websocket disconnected");

    Ok(())
}

/// Parse one frame and hand it to the relay. A malformed frame is answered
/// with an `error` message and otherwise dropped.
async fn handle_text_message(
    text: &str,
    tx: &mpsc::UnboundedSender<OutboundMessage>,
    handle: &RelayHandle,
    peer_id: PeerId,
) -> Result<(), SignalingError> {
    let client_msg = match ClientMessage::parse(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(peer = %peer_id, "{}", e);
            let err = ServerMessage::Error {
                message: e.to_string(),
            };
            let _ = tx.send(err.to_outbound()?);
            return Ok(());
        }
    };

    debug!(peer = %peer_id, room = %client_msg.room_id(), "frame received");
    handle.route(peer_id, client_msg).await
}

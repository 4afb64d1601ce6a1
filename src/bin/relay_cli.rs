use std::error::Error;

use carapace_relay::signaling::{ClientMessage, RoomId, ServerMessage};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{self, AsyncBufReadExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One signaling session. Created and torn down by the caller.
struct RelayClient {
    sink: SplitSink<Ws, Message>,
    room: RoomId,
}

impl RelayClient {
    async fn connect(url: &str, room: RoomId) -> Result<(Self, SplitStream<Ws>), Box<dyn Error>> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        let (sink, stream) = ws.split();
        Ok((Self { sink, room }, stream))
    }

    async fn send(&mut self, msg: &ClientMessage) -> Result<(), Box<dyn Error>> {
        let text = serde_json::to_string(msg)?;
        self.sink.send(Message::text(text)).await?;
        Ok(())
    }

    async fn join(&mut self) -> Result<(), Box<dyn Error>> {
        let msg = ClientMessage::JoinRoom {
            room_id: self.room.clone(),
        };
        self.send(&msg).await
    }

    async fn close(mut self) -> Result<(), Box<dyn Error>> {
        self.sink.close().await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let room = args.next().ok_or("usage: relay_cli <room> [ws://host:port]")?;
    let url = args
        .next()
        .unwrap_or_else(|| "ws://127.0.0.1:3479".to_string());

    let (mut client, stream) = RelayClient::connect(&url, RoomId::from(room)).await?;
    client.join().await?;

    println!("Joined room {} via {}", client.room, url);
    println!("Commands: offer <json> | answer <json> | ice <json> | join | leave");

    tokio::spawn(listen(stream));

    let mut stdin = io::BufReader::new(io::stdin()).lines();
    while let Ok(Some(line)) = stdin.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&client.room, &line) {
            Ok(msg) => client.send(&msg).await?,
            Err(e) => eprintln!("{}", e),
        }
    }

    client.close().await
}

/// Turn an input line like `offer {"type":"offer","sdp":"..."}` into a message.
fn parse_command(room: &RoomId, line: &str) -> Result<ClientMessage, String> {
    let line = line.trim();
    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let room_id = room.clone();
    let payload = || {
        serde_json::from_str::<serde_json::Value>(rest)
            .map_err(|e| format!("bad JSON payload: {}", e))
    };

    match cmd {
        "offer" => Ok(ClientMessage::Offer { sdp: payload()?, room_id }),
        "answer" => Ok(ClientMessage::Answer { sdp: payload()?, room_id }),
        "ice" => Ok(ClientMessage::IceCandidate { candidate: payload()?, room_id }),
        "join" => Ok(ClientMessage::JoinRoom { room_id }),
        "leave" => Ok(ClientMessage::LeaveRoom { room_id }),
        other => Err(format!("unknown command: {}", other)),
    }
}

/// Human-readable line for one server frame. Unknown frames are shown raw.
fn describe(text: &str) -> String {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Welcome { peer_id }) => format!("You are {}", peer_id),
        Ok(ServerMessage::RoomJoined { room_id, peers }) => {
            let peers: Vec<&str> = peers.iter().map(|p| p.as_str()).collect();
            format!("joined {} with peers [{}]", room_id, peers.join(", "))
        }
        Ok(ServerMessage::PeerJoined { peer_id }) => format!("{} joined", peer_id),
        Ok(ServerMessage::PeerLeft { peer_id }) => format!("{} left", peer_id),
        Ok(ServerMessage::Offer { sdp, peer_id }) => format!("offer from {}: {}", peer_id, sdp),
        Ok(ServerMessage::Answer { sdp, peer_id }) => format!("answer from {}: {}", peer_id, sdp),
        Ok(ServerMessage::IceCandidate { candidate, peer_id }) => {
            format!("candidate from {}: {}", peer_id, candidate)
        }
        Ok(ServerMessage::Error { message }) => format!("server error: {}", message),
        Err(_) => text.to_string(),
    }
}

async fn listen(mut stream: SplitStream<Ws>) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => println!("\n> {}", describe(&text)),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
    println!("Connection closed");
}

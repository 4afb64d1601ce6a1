use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{OutboundMessage, PeerId, RoomId, SignalingError};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Join a room, creating it if nobody is in it yet
    JoinRoom { room_id: RoomId },

    /// Leave a room without closing the connection
    LeaveRoom { room_id: RoomId },

    /// SDP offer for the other members of the room
    Offer { sdp: Value, room_id: RoomId },

    /// SDP answer for the other members of the room
    Answer { sdp: Value, room_id: RoomId },

    /// ICE candidate for the other members of the room
    IceCandidate { candidate: Value, room_id: RoomId },
}

impl ClientMessage {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, SignalingError> {
        serde_json::from_str(text).map_err(|e| SignalingError::MalformedMessage(e.to_string()))
    }

    pub fn room_id(&self) -> &RoomId {
        match self {
            ClientMessage::JoinRoom { room_id }
            | ClientMessage::LeaveRoom { room_id }
            | ClientMessage::Offer { room_id, .. }
            | ClientMessage::Answer { room_id, .. }
            | ClientMessage::IceCandidate { room_id, .. } => room_id,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Sent once after the connection is accepted
    Welcome { peer_id: PeerId },

    /// Join acknowledged, with the members that were already there
    RoomJoined { room_id: RoomId, peers: Vec<PeerId> },

    /// Another peer joined a room we are in
    PeerJoined { peer_id: PeerId },

    /// Another peer left a room we are in, or disconnected
    PeerLeft { peer_id: PeerId },

    /// Relayed offer, tagged with the sender
    Offer { sdp: Value, peer_id: PeerId },

    /// Relayed answer, tagged with the sender
    Answer { sdp: Value, peer_id: PeerId },

    /// Relayed ICE candidate, tagged with the sender
    IceCandidate { candidate: Value, peer_id: PeerId },

    /// Error response
    Error { message: String },
}

impl ServerMessage {
    /// Serialize into a frame ready for the outbound channel.
    pub fn to_outbound(&self) -> Result<OutboundMessage, SignalingError> {
        serde_json::to_string(self)
            .map(OutboundMessage::from)
            .map_err(|e| SignalingError::Internal(format!("serialize server message: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_join_room() {
        let json = r#"{"type": "join-room", "roomId": "abc"}"#;
        let msg = ClientMessage::parse(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom {
                room_id: RoomId::from("abc")
            }
        );
    }

    #[test]
    fn parse_leave_room() {
        let json = r#"{"type": "leave-room", "roomId": "abc"}"#;
        let msg = ClientMessage::parse(json).unwrap();
        assert!(matches!(msg, ClientMessage::LeaveRoom { .. }));
    }

    #[test]
    fn parse_offer_keeps_payload_structure() {
        let json = r#"{"type": "offer", "sdp": {"type": "offer", "sdp": "v=0\r\n", "extra": [1, 2]}, "roomId": "abc"}"#;
        if let ClientMessage::Offer { sdp, room_id } = ClientMessage::parse(json).unwrap() {
            assert_eq!(room_id.as_str(), "abc");
            assert_eq!(sdp, json!({"type": "offer", "sdp": "v=0\r\n", "extra": [1, 2]}));
        } else {
            panic!("Expected Offer");
        }
    }

    #[test]
    fn parse_ice_candidate() {
        let json = r#"{"type": "ice-candidate", "candidate": {"candidate": "candidate:1 1 udp 2122260223 10.0.0.1 54400 typ host", "sdpMid": "0"}, "roomId": "r"}"#;
        let msg = ClientMessage::parse(json).unwrap();
        assert_eq!(msg.room_id().as_str(), "r");
        assert!(matches!(msg, ClientMessage::IceCandidate { .. }));
    }

    #[test]
    fn payload_shape_is_not_validated() {
        let json = r#"{"type": "answer", "sdp": "just a string", "roomId": "abc"}"#;
        let msg = ClientMessage::parse(json).unwrap();
        assert!(matches!(msg, ClientMessage::Answer { sdp: Value::String(_), .. }));
    }

    #[test]
    fn missing_room_id_is_malformed() {
        let json = r#"{"type": "offer", "sdp": {}}"#;
        let err = ClientMessage::parse(json).unwrap_err();
        assert!(matches!(err, SignalingError::MalformedMessage(_)));
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let err = ClientMessage::parse(r#"{"type": "hang-up", "roomId": "abc"}"#).unwrap_err();
        assert!(matches!(err, SignalingError::MalformedMessage(_)));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = ClientMessage::parse("not json").unwrap_err();
        assert!(matches!(err, SignalingError::MalformedMessage(_)));
    }

    #[test]
    fn serialize_welcome() {
        let msg = ServerMessage::Welcome {
            peer_id: PeerId::from("peer_abc12345"),
        };
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "welcome", "peerId": "peer_abc12345"}));
    }

    #[test]
    fn serialize_peer_joined() {
        let msg = ServerMessage::PeerJoined {
            peer_id: PeerId::from("peer_new12345"),
        };
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "peer-joined", "peerId": "peer_new12345"}));
    }

    #[test]
    fn serialize_room_joined() {
        let msg = ServerMessage::RoomJoined {
            room_id: RoomId::from("abc"),
            peers: vec![PeerId::from("peer_existing")],
        };
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "room-joined", "roomId": "abc", "peers": ["peer_existing"]})
        );
    }

    #[test]
    fn serialize_peer_left() {
        let msg = ServerMessage::PeerLeft {
            peer_id: PeerId::from("peer_old12345"),
        };
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "peer-left", "peerId": "peer_old12345"}));
    }

    #[test]
    fn serialize_relayed_ice_candidate() {
        let msg = ServerMessage::IceCandidate {
            candidate: json!({"candidate": "c", "sdpMLineIndex": 0}),
            peer_id: PeerId::from("peer_aaaabbbb"),
        };
        let value: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "ice-candidate",
                "candidate": {"candidate": "c", "sdpMLineIndex": 0},
                "peerId": "peer_aaaabbbb"
            })
        );
    }

    #[test]
    fn serialize_error() {
        let msg = ServerMessage::Error {
            message: "Invalid message".to_string(),
        };
        let out = msg.to_outbound().unwrap();
        assert!(out.as_str().contains("\"type\":\"error\""));
        assert!(out.as_str().contains("Invalid message"));
    }
}

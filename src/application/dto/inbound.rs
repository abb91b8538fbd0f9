//! Client-to-relay messages.

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::shared::validation::room_name;

/// Every frame a client may send, tagged by `type`.
///
/// Required fields are enforced at decode time; a frame that fails to
/// decode is malformed and is dropped by the router.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Post to a room.
    Message(ChatMessage),

    JoinRoom(RoomRequest),

    LeaveRoom,

    CreateRoom(RoomRequest),

    ListRooms,

    /// Offer a peer connection.
    ConnectRequest(PeerRequest),

    /// Accept an offer; establishes the link.
    ConnectAccept(PeerRequest),

    /// Opaque payload for the linked peer.
    EncryptedMessage(EncryptedPayload),

    DisconnectPeer,

    /// Client-initiated keepalive; answered with `pong`.
    Ping,

    /// Acknowledgement of a relay heartbeat probe.
    Pong,
}

impl ClientMessage {
    /// Wire tag, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Message(_) => "message",
            ClientMessage::JoinRoom(_) => "join_room",
            ClientMessage::LeaveRoom => "leave_room",
            ClientMessage::CreateRoom(_) => "create_room",
            ClientMessage::ListRooms => "list_rooms",
            ClientMessage::ConnectRequest(_) => "connect_request",
            ClientMessage::ConnectAccept(_) => "connect_accept",
            ClientMessage::EncryptedMessage(_) => "encrypted_message",
            ClientMessage::DisconnectPeer => "disconnect_peer",
            ClientMessage::Ping => "ping",
            ClientMessage::Pong => "pong",
        }
    }
}

/// Room broadcast request.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct ChatMessage {
    #[validate(custom(function = "room_name"))]
    pub room: String,

    pub content: String,

    #[serde(default)]
    #[validate(length(max = 64, message = "User name must be at most 64 characters"))]
    pub user: Option<String>,
}

/// `join_room` / `create_room` body.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct RoomRequest {
    #[validate(custom(function = "room_name"))]
    pub room: String,
}

/// `connect_request` / `connect_accept` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRequest {
    #[serde(alias = "targetDeviceId")]
    pub target_id: String,

    /// Endpoint key material, forwarded verbatim.
    #[serde(default)]
    pub public_key: Option<Value>,
}

/// `encrypted_message` body. Only `target_id` is read by the relay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    #[serde(alias = "targetDeviceId")]
    pub target_id: String,

    #[serde(alias = "encryptedContent")]
    pub content: Value,

    #[serde(default)]
    pub iv: Option<Value>,

    #[serde(default)]
    pub timestamp: Option<Value>,
}

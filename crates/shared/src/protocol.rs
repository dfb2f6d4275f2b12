//! Wire frames exchanged over a room channel at `.../ws/{roomId}`.
//!
//! All frames are JSON text. Outbound frames are tagged by `message_type`;
//! inbound control frames by `type`. Inbound chat messages carry no `type`
//! and are recognised by shape.

use serde::{Deserialize, Serialize};

use crate::models::{FileInfo, MessageKind, Participant};

/// Field that marks an inbound frame as a control frame.
pub const CONTROL_TAG: &str = "type";

/// Frames sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientFrame {
    Join {
        content: String,
    },
    Message {
        content: String,
    },
    File {
        content: String,
        file_info: FileInfo,
    },
}

/// Session metadata pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    ChatInfo {
        max_participants: u32,
        participants: Vec<Participant>,
    },
    ParticipantJoined {
        participant_id: String,
        participant_name: String,
    },
    ParticipantLeft {
        participant_id: String,
    },
}

impl ControlFrame {
    pub const KNOWN_TYPES: [&'static str; 3] =
        ["chat_info", "participant_joined", "participant_left"];
}

/// A chat message as broadcast by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub message_type: MessageKind,
    /// ISO-8601. Kept as raw JSON so a missing, invalid or non-string
    /// value falls back to the receive time instead of rejecting the frame.
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
}

//! Domain records for an ephemeral chat room.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix carried by ids the client assigns to its own optimistic echoes.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Participant cap assumed until the server reports one.
pub const DEFAULT_ROOM_CAPACITY: u32 = 2;

// --- Messages ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Text,
    File,
    Join,
    Leave,
    System,
}

impl MessageKind {
    /// Join and Leave messages double as membership signals.
    pub fn is_membership(&self) -> bool {
        matches!(self, MessageKind::Join | MessageKind::Leave)
    }
}

/// An attached file, base64 encoded. Field names follow the wire shape
/// `{name, size, mime_type, content}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(rename = "content")]
    pub base64_content: String,
}

impl FileInfo {
    /// Decode the payload back into raw bytes, e.g. to save a received file.
    pub fn decode_content(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.base64_content.as_bytes())
    }

    /// Size rendered in kilobytes with one decimal, as shown next to a file.
    pub fn human_size(&self) -> String {
        format!("{:.1} KB", self.size_bytes as f64 / 1024.0)
    }

    /// Caption sent as the message body alongside the file.
    pub fn caption(&self) -> String {
        format!("Shared a file: {}", self.name)
    }
}

/// One chat event in a room transcript. Immutable once created.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
    /// Set on optimistic echoes created by this client.
    pub is_local: bool,
}

// --- Participants ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Participant {
    pub id: String,
    pub username: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

// --- Room creation ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRoomRequest {
    pub max_participants: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRoomResponse {
    pub chat_id: String,
    pub max_participants: u32,
    pub web_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onion_address: Option<String>,
}

/// Link another participant can open to enter the room.
pub fn share_link(origin: &str, room_id: &str) -> String {
    format!("{}/chat/{}", origin.trim_end_matches('/'), room_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> FileInfo {
        FileInfo {
            name: "notes.txt".to_string(),
            size_bytes: 2048,
            mime_type: "text/plain".to_string(),
            base64_content: BASE64.encode(b"hello there"),
        }
    }

    #[test]
    fn file_info_uses_wire_field_names() {
        let json = serde_json::to_value(sample_file()).unwrap();
        assert_eq!(json["size"], 2048);
        assert_eq!(json["mime_type"], "text/plain");
        assert!(json.get("content").is_some());
        assert!(json.get("size_bytes").is_none());
    }

    #[test]
    fn file_info_helpers() {
        let file = sample_file();
        assert_eq!(file.decode_content().unwrap(), b"hello there");
        assert_eq!(file.human_size(), "2.0 KB");
        assert_eq!(file.caption(), "Shared a file: notes.txt");
    }

    #[test]
    fn share_link_trims_trailing_slash() {
        assert_eq!(
            share_link("https://anonchat.space/", "abcd"),
            "https://anonchat.space/chat/abcd"
        );
    }

    #[test]
    fn create_room_response_without_onion_address() {
        let body = r#"{"chat_id":"abcd","max_participants":3,"web_address":"https://x/chat/abcd"}"#;
        let parsed: CreateRoomResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.chat_id, "abcd");
        assert_eq!(parsed.onion_address, None);
    }
}

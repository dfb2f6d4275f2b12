//! Pure translation between wire frames and domain records.
//!
//! [`decode`] never fails: frames that cannot be classified are logged and
//! reported as [`DecodedEvent::Noop`] so the caller can keep reading.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::CodecError;
use crate::models::{FileInfo, Message, MessageKind, Participant};
use crate::protocol::{ClientFrame, ControlFrame, WireMessage, CONTROL_TAG};

/// Something the local user wants to put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundIntent {
    Join { display_name: String },
    Text { content: String },
    File { caption: String, file_info: FileInfo },
}

impl OutboundIntent {
    pub fn join(display_name: impl Into<String>) -> Self {
        OutboundIntent::Join {
            display_name: display_name.into(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        OutboundIntent::Text {
            content: content.into(),
        }
    }

    /// File intent captioned "Shared a file: {name}".
    pub fn file(file_info: FileInfo) -> Self {
        OutboundIntent::File {
            caption: file_info.caption(),
            file_info,
        }
    }

    /// The body text carried by the frame.
    pub fn content(&self) -> &str {
        match self {
            OutboundIntent::Join { display_name } => display_name,
            OutboundIntent::Text { content } => content,
            OutboundIntent::File { caption, .. } => caption,
        }
    }

    /// Kind of the transcript entry this intent produces when echoed locally.
    pub fn kind(&self) -> MessageKind {
        match self {
            OutboundIntent::Join { .. } => MessageKind::Join,
            OutboundIntent::Text { .. } => MessageKind::Text,
            OutboundIntent::File { .. } => MessageKind::File,
        }
    }
}

impl From<OutboundIntent> for ClientFrame {
    fn from(intent: OutboundIntent) -> Self {
        match intent {
            OutboundIntent::Join { display_name } => ClientFrame::Join {
                content: display_name,
            },
            OutboundIntent::Text { content } => ClientFrame::Message { content },
            OutboundIntent::File { caption, file_info } => ClientFrame::File {
                content: caption,
                file_info,
            },
        }
    }
}

/// Classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    RosterSnapshot {
        capacity: u32,
        participants: Vec<Participant>,
    },
    ParticipantJoined(Participant),
    ParticipantLeft {
        id: String,
    },
    Message(Message),
    /// Frame was dropped; nothing to apply.
    Noop,
}

/// Serialize an outbound intent into a JSON text frame.
pub fn encode(intent: &OutboundIntent) -> Result<String, CodecError> {
    let frame = ClientFrame::from(intent.clone());
    serde_json::to_string(&frame).map_err(CodecError::Encode)
}

/// Decode a raw frame, logging and swallowing any failure.
pub fn decode(raw: &str) -> DecodedEvent {
    match try_decode(raw) {
        Ok(event) => event,
        Err(CodecError::UnknownControl(kind)) => {
            tracing::debug!(%kind, "ignoring unknown control frame");
            DecodedEvent::Noop
        }
        Err(error) => {
            tracing::warn!(%error, frame_len = raw.len(), "dropping malformed frame");
            DecodedEvent::Noop
        }
    }
}

/// Decode a raw frame, reporting why it was rejected.
pub fn try_decode(raw: &str) -> Result<DecodedEvent, CodecError> {
    let value: Value = serde_json::from_str(raw).map_err(CodecError::InvalidJson)?;
    let Some(object) = value.as_object() else {
        return Err(CodecError::NotAnObject);
    };

    match object.get(CONTROL_TAG) {
        Some(Value::String(kind)) => {
            if !ControlFrame::KNOWN_TYPES.contains(&kind.as_str()) {
                return Err(CodecError::UnknownControl(kind.clone()));
            }
            let frame: ControlFrame = serde_json::from_value(value.clone())
                .map_err(|source| CodecError::Malformed {
                    kind: "control",
                    source,
                })?;
            Ok(control_event(frame))
        }
        Some(other) => Err(CodecError::UnknownControl(other.to_string())),
        None => {
            let wire: WireMessage =
                serde_json::from_value(value).map_err(|source| CodecError::Malformed {
                    kind: "chat message",
                    source,
                })?;
            message_from_wire(wire).map(DecodedEvent::Message)
        }
    }
}

fn control_event(frame: ControlFrame) -> DecodedEvent {
    match frame {
        ControlFrame::ChatInfo {
            max_participants,
            participants,
        } => DecodedEvent::RosterSnapshot {
            capacity: max_participants,
            participants,
        },
        ControlFrame::ParticipantJoined {
            participant_id,
            participant_name,
        } => DecodedEvent::ParticipantJoined(Participant::new(participant_id, participant_name)),
        ControlFrame::ParticipantLeft { participant_id } => {
            DecodedEvent::ParticipantLeft { id: participant_id }
        }
    }
}

fn message_from_wire(wire: WireMessage) -> Result<Message, CodecError> {
    let file_info = match wire.message_type {
        MessageKind::File => match wire.file_info {
            Some(info) => Some(info),
            None => return Err(CodecError::MissingFileInfo(wire.id)),
        },
        // fileInfo is only meaningful on File messages
        _ => None,
    };

    Ok(Message {
        timestamp: parse_timestamp(wire.timestamp.as_ref().and_then(Value::as_str)),
        id: wire.id,
        chat_id: wire.chat_id,
        sender_id: wire.sender_id,
        sender_name: wire.sender_name,
        content: wire.content,
        kind: wire.message_type,
        file_info,
        is_local: false,
    })
}

/// Parse an ISO-8601 timestamp. Offsets are honoured; naive timestamps are
/// read as UTC. Missing or unparseable input yields the current time.
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Utc::now();
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return naive.and_utc();
    }
    tracing::debug!(timestamp = raw, "unparseable timestamp, using now");
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn encodes_join_frame() {
        let frame = encode(&OutboundIntent::join("alice")).unwrap();
        assert_eq!(frame, r#"{"message_type":"join","content":"alice"}"#);
    }

    #[test]
    fn encodes_text_frame() {
        let frame = encode(&OutboundIntent::text("hello")).unwrap();
        assert_eq!(frame, r#"{"message_type":"message","content":"hello"}"#);
    }

    #[test]
    fn encodes_file_frame_with_caption() {
        let info = FileInfo {
            name: "a.png".to_string(),
            size_bytes: 3,
            mime_type: "image/png".to_string(),
            base64_content: "AAEC".to_string(),
        };
        let frame = encode(&OutboundIntent::file(info)).unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({
                "message_type": "file",
                "content": "Shared a file: a.png",
                "file_info": {"name": "a.png", "size": 3, "mime_type": "image/png", "content": "AAEC"}
            })
        );
    }

    #[test]
    fn decodes_roster_snapshot() {
        let raw = r#"{"type":"chat_info","max_participants":2,"participants":[{"id":"u1","username":"alice"}]}"#;
        assert_eq!(
            decode(raw),
            DecodedEvent::RosterSnapshot {
                capacity: 2,
                participants: vec![Participant::new("u1", "alice")],
            }
        );
    }

    #[test]
    fn decodes_membership_control_frames() {
        let joined = r#"{"type":"participant_joined","participant_id":"u2","participant_name":"bob"}"#;
        assert_eq!(
            decode(joined),
            DecodedEvent::ParticipantJoined(Participant::new("u2", "bob"))
        );
        let left = r#"{"type":"participant_left","participant_id":"u2"}"#;
        assert_eq!(
            decode(left),
            DecodedEvent::ParticipantLeft {
                id: "u2".to_string()
            }
        );
    }

    #[test]
    fn decodes_chat_message() {
        let raw = json!({
            "id": "m1",
            "chat_id": "abcd",
            "sender_id": "u2",
            "sender_name": "bob",
            "content": "hi",
            "message_type": "Text",
            "timestamp": "2024-05-01T10:00:00Z"
        })
        .to_string();
        let DecodedEvent::Message(message) = decode(&raw) else {
            panic!("expected a message");
        };
        assert_eq!(message.id, "m1");
        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(
            message.timestamp,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert!(!message.is_local);
    }

    #[test]
    fn non_string_timestamp_falls_back_to_now() {
        let before = Utc::now();
        for timestamp in [json!(1714557600), json!({"secs": 1}), Value::Null] {
            let raw = json!({
                "id": "m1", "chat_id": "abcd", "sender_id": "u2", "sender_name": "bob",
                "content": "hi", "message_type": "Text", "timestamp": timestamp.clone()
            })
            .to_string();
            let Ok(DecodedEvent::Message(message)) = try_decode(&raw) else {
                panic!("expected a message for timestamp {timestamp}");
            };
            assert_eq!(message.content, "hi");
            assert!(message.timestamp >= before);
        }
    }

    #[test]
    fn decodes_file_message_with_file_info() {
        let raw = json!({
            "id": "m2", "chat_id": "abcd", "sender_id": "u2", "sender_name": "bob",
            "content": "Shared a file: notes.txt", "message_type": "File",
            "timestamp": "2024-05-01T10:00:00Z",
            "file_info": {"name": "notes.txt", "size": 2, "mime_type": "text/plain", "content": "aGk="}
        })
        .to_string();
        let DecodedEvent::Message(message) = decode(&raw) else {
            panic!("expected a message");
        };
        assert_eq!(message.kind, MessageKind::File);
        let info = message.file_info.expect("file info kept");
        assert_eq!(info.name, "notes.txt");
        assert_eq!(info.size_bytes, 2);
        assert_eq!(info.mime_type, "text/plain");
        assert_eq!(info.decode_content().unwrap(), b"hi");
    }

    #[test]
    fn file_info_is_dropped_on_non_file_messages() {
        let raw = json!({
            "id": "m1", "chat_id": "abcd", "sender_id": "u2", "sender_name": "bob",
            "content": "hi", "message_type": "Text",
            "file_info": {"name": "x", "size": 1, "mime_type": "text/plain", "content": "eA=="}
        })
        .to_string();
        let DecodedEvent::Message(message) = decode(&raw) else {
            panic!("expected a message");
        };
        assert_eq!(message.file_info, None);
    }

    #[test]
    fn file_message_without_file_info_is_rejected() {
        let raw = json!({
            "id": "m1", "chat_id": "abcd", "sender_id": "u2", "sender_name": "bob",
            "content": "Shared a file: x", "message_type": "File"
        })
        .to_string();
        assert!(matches!(
            try_decode(&raw),
            Err(CodecError::MissingFileInfo(id)) if id == "m1"
        ));
        assert_eq!(decode(&raw), DecodedEvent::Noop);
    }

    #[test]
    fn malformed_frames_become_noop() {
        for raw in [
            "not json",
            "[1,2,3]",
            r#"{"type":"chat_info","participants":[]}"#,
            r#"{"type":"participant_joined","participant_id":"u2"}"#,
            r#"{"type":"participant_left"}"#,
            r#"{"type":"typing","participant_id":"u2"}"#,
            r#"{"type":7}"#,
            r#"{"id":"m1","content":"missing everything else"}"#,
            r#"{"id":"m1","chat_id":"c","sender_id":"s","sender_name":"n","content":"x","message_type":"Shout"}"#,
        ] {
            assert_eq!(decode(raw), DecodedEvent::Noop, "frame {raw}");
        }
    }

    #[test]
    fn unknown_control_type_is_reported() {
        assert!(matches!(
            try_decode(r#"{"type":"typing"}"#),
            Err(CodecError::UnknownControl(kind)) if kind == "typing"
        ));
    }

    #[test]
    fn timestamp_parsing_is_tolerant() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp(Some("2024-05-01T12:00:00+02:00")), expected);
        assert_eq!(parse_timestamp(Some("2024-05-01T10:00:00")), expected);
        assert!(parse_timestamp(Some("2024-05-01T10:00:00.123456")) > expected);

        let before = Utc::now();
        assert!(parse_timestamp(Some("yesterday-ish")) >= before);
        assert!(parse_timestamp(None) >= before);
        assert!(parse_timestamp(Some("  ")) >= before);
    }
}

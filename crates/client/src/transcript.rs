//! Ordered, append-only record of chat events for one session.

use std::collections::HashSet;

use anonchat_shared::Message;

/// Messages in arrival order. Entries are never reordered or removed, and
/// each id appears at most once.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    ids: HashSet<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Returns false if a message with the same id is
    /// already present (deduplication).
    pub fn append(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        if !self.ids.contains(id) {
            return None;
        }
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anonchat_shared::MessageKind;
    use chrono::{Duration, Utc};

    fn message(id: &str, content: &str) -> Message {
        Message {
            id: id.to_string(),
            chat_id: "abcd".to_string(),
            sender_id: "u1".to_string(),
            sender_name: "alice".to_string(),
            content: content.to_string(),
            kind: MessageKind::Text,
            timestamp: Utc::now(),
            file_info: None,
            is_local: false,
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut transcript = Transcript::new();
        assert!(transcript.append(message("m1", "first")));
        assert!(!transcript.append(message("m1", "again")));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.get("m1").unwrap().content, "first");
    }

    #[test]
    fn arrival_order_is_kept_regardless_of_timestamps() {
        let mut transcript = Transcript::new();
        let mut older = message("m2", "older");
        older.timestamp = Utc::now() - Duration::minutes(5);
        transcript.append(message("m1", "newer"));
        transcript.append(older);

        let ids: Vec<_> = transcript.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert_eq!(transcript.last().unwrap().id, "m2");
        assert!(transcript.get("missing").is_none());
    }
}

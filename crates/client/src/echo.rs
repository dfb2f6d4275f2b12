//! Optimistic echoes of locally sent messages.
//!
//! Every outbound text or file is appended to the transcript at send time as
//! a local copy. If the server broadcasts the sender's own message back, the
//! inbound copy is matched against the pending echoes by sender, kind and
//! content within a time window and suppressed, so the transcript shows the
//! message once. A display name alone never identifies the sender: until the
//! server-assigned id is learned, it is taken from the roster, and only when
//! exactly one participant carries our name.

use std::collections::VecDeque;
use std::time::Duration;

use anonchat_shared::{Message, MessageKind, OutboundIntent, LOCAL_ID_PREFIX};
use chrono::Utc;
use tokio::time::Instant;

/// Sender id used on echoes until the server-assigned id is known.
pub const LOCAL_SENDER_ID: &str = "local";

#[derive(Debug, Clone)]
struct PendingEcho {
    kind: MessageKind,
    content: String,
    sent_at: Instant,
}

#[derive(Debug, Clone)]
pub struct OptimisticEchoBuffer {
    chat_id: String,
    display_name: String,
    window: Duration,
    pending: VecDeque<PendingEcho>,
    own_sender_id: Option<String>,
}

impl OptimisticEchoBuffer {
    pub fn new(
        chat_id: impl Into<String>,
        display_name: impl Into<String>,
        window: Duration,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            display_name: display_name.into(),
            window,
            pending: VecDeque::new(),
            own_sender_id: None,
        }
    }

    /// Build the local copy of an outbound intent and remember it until the
    /// server's copy arrives or the window lapses.
    pub fn echo(&mut self, intent: &OutboundIntent) -> Message {
        let now = Instant::now();
        self.expire(now);

        let kind = intent.kind();
        let content = intent.content().to_string();
        let file_info = match intent {
            OutboundIntent::File { file_info, .. } => Some(file_info.clone()),
            _ => None,
        };

        self.pending.push_back(PendingEcho {
            kind,
            content: content.clone(),
            sent_at: now,
        });

        Message {
            id: format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4()),
            chat_id: self.chat_id.clone(),
            sender_id: self
                .own_sender_id
                .clone()
                .unwrap_or_else(|| LOCAL_SENDER_ID.to_string()),
            sender_name: self.display_name.clone(),
            content,
            kind,
            timestamp: Utc::now(),
            file_info,
            is_local: true,
        }
    }

    /// Returns true if `inbound` is the server's copy of a pending echo. The
    /// matching entry is consumed.
    ///
    /// The sender must be identified by id: the learned own id, or else
    /// `roster_id`, the id of the only roster entry carrying our display
    /// name. Without either, nothing is suppressed.
    pub fn reconcile(&mut self, inbound: &Message, roster_id: Option<&str>) -> bool {
        self.expire(Instant::now());

        if inbound.sender_name != self.display_name {
            return false;
        }
        match self.own_sender_id.as_deref().or(roster_id) {
            Some(id) if id == inbound.sender_id => {}
            _ => return false,
        }

        let Some(pos) = self
            .pending
            .iter()
            .position(|p| p.kind == inbound.kind && p.content == inbound.content)
        else {
            return false;
        };
        self.pending.remove(pos);

        if self.own_sender_id.is_none() {
            tracing::debug!(sender_id = %inbound.sender_id, "learned own sender id from echo");
            self.own_sender_id = Some(inbound.sender_id.clone());
        }
        true
    }

    /// Whether a transcript entry was written by this client.
    pub fn is_own(&self, message: &Message) -> bool {
        message.is_local || self.own_sender_id.as_deref() == Some(message.sender_id.as_str())
    }

    pub fn own_sender_id(&self) -> Option<&str> {
        self.own_sender_id.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn expire(&mut self, now: Instant) {
        // entries are pushed in send order, so the oldest sit at the front
        while let Some(front) = self.pending.front() {
            if now.saturating_duration_since(front.sent_at) <= self.window {
                break;
            }
            self.pending.pop_front();
        }
    }
}

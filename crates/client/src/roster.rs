//! Room membership.
//!
//! Membership changes reach the client three ways: the `chat_info` snapshot,
//! `participant_joined`/`participant_left` control frames, and Join/Leave chat
//! messages. All three are normalised into [`MembershipEvent`] and applied
//! with idempotent set operations, so the result does not depend on which
//! channel reports a change first or how often.

use anonchat_shared::{DecodedEvent, MessageKind, Participant, DEFAULT_ROOM_CAPACITY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// Authoritative roster; replaces whatever was known.
    Snapshot {
        capacity: u32,
        participants: Vec<Participant>,
    },
    Joined(Participant),
    Left { id: String },
}

impl MembershipEvent {
    /// Membership change carried by a decoded frame, if any.
    pub fn from_decoded(event: &DecodedEvent) -> Option<Self> {
        match event {
            DecodedEvent::RosterSnapshot {
                capacity,
                participants,
            } => Some(MembershipEvent::Snapshot {
                capacity: *capacity,
                participants: participants.clone(),
            }),
            DecodedEvent::ParticipantJoined(participant) => {
                Some(MembershipEvent::Joined(participant.clone()))
            }
            DecodedEvent::ParticipantLeft { id } => Some(MembershipEvent::Left { id: id.clone() }),
            DecodedEvent::Message(message) => match message.kind {
                MessageKind::Join => Some(MembershipEvent::Joined(Participant::new(
                    message.sender_id.clone(),
                    message.sender_name.clone(),
                ))),
                MessageKind::Leave => Some(MembershipEvent::Left {
                    id: message.sender_id.clone(),
                }),
                _ => None,
            },
            DecodedEvent::Noop => None,
        }
    }
}

/// Participants keyed by id, in order of first appearance, plus the room cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterTracker {
    participants: Vec<Participant>,
    capacity: u32,
}

impl Default for RosterTracker {
    fn default() -> Self {
        Self {
            participants: Vec::new(),
            capacity: DEFAULT_ROOM_CAPACITY,
        }
    }
}

impl RosterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one membership event. Returns true if the roster changed.
    pub fn apply(&mut self, event: MembershipEvent) -> bool {
        match event {
            MembershipEvent::Snapshot {
                capacity,
                participants,
            } => self.replace(capacity, participants),
            MembershipEvent::Joined(participant) => self.upsert(participant),
            MembershipEvent::Left { id } => self.remove(&id),
        }
    }

    /// Insert or rename a participant. Re-adding an identical entry is a no-op.
    pub fn upsert(&mut self, participant: Participant) -> bool {
        match self.participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) if existing.username == participant.username => false,
            Some(existing) => {
                existing.username = participant.username;
                true
            }
            None => {
                self.participants.push(participant);
                true
            }
        }
    }

    /// Remove a participant. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.id != id);
        self.participants.len() != before
    }

    /// Replace the roster with a snapshot. Duplicate ids in the snapshot
    /// collapse to the last entry's username.
    pub fn replace(&mut self, capacity: u32, participants: Vec<Participant>) -> bool {
        let mut next = RosterTracker {
            participants: Vec::with_capacity(participants.len()),
            capacity,
        };
        for participant in participants {
            next.upsert(participant);
        }
        let changed = *self != next;
        *self = next;
        changed
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() as u64 >= u64::from(self.capacity)
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Id of the participant called `username`, if exactly one is.
    pub fn unique_id_for(&self, username: &str) -> Option<&str> {
        let mut named = self.participants.iter().filter(|p| p.username == username);
        match (named.next(), named.next()) {
            (Some(only), None) => Some(only.id.as_str()),
            _ => None,
        }
    }
}

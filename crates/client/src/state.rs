//! Session state shared between the connection driver and the facade.
//!
//! Every mutation made on behalf of a connection carries the epoch that
//! connection was started under. Once `close()` or a newer `connect()` bumps
//! the epoch, writes from the old driver are refused, so a superseded socket
//! or a retry timer that fires late cannot touch the session.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anonchat_shared::{DecodedEvent, Message, Participant};
use futures_channel::mpsc::UnboundedSender;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::echo::OptimisticEchoBuffer;
use crate::roster::{MembershipEvent, RosterTracker};
use crate::transcript::Transcript;
use crate::ws::ConnectionStatus;

/// Change notifications for whoever renders the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(ConnectionStatus),
    MessageAppended(Message),
    RosterChanged {
        capacity: u32,
        participants: Vec<Participant>,
    },
    Error(String),
}

/// Point-in-time copy of the session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub connection_status: ConnectionStatus,
    pub room_capacity: u32,
    pub participants: Vec<Participant>,
    pub transcript: Vec<Message>,
    /// True until the first connection attempt settles.
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub own_sender_id: Option<String>,
}

pub(crate) struct SessionState {
    pub(crate) epoch: u64,
    pub(crate) status: ConnectionStatus,
    pub(crate) outbound: Option<UnboundedSender<String>>,
    pub(crate) roster: RosterTracker,
    pub(crate) transcript: Transcript,
    pub(crate) echoes: OptimisticEchoBuffer,
    pub(crate) is_loading: bool,
    pub(crate) last_error: Option<String>,
}

impl SessionState {
    pub(crate) fn new(echoes: OptimisticEchoBuffer) -> Self {
        Self {
            epoch: 0,
            status: ConnectionStatus::Idle,
            outbound: None,
            roster: RosterTracker::new(),
            transcript: Transcript::new(),
            echoes,
            is_loading: true,
            last_error: None,
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            connection_status: self.status.clone(),
            room_capacity: self.roster.capacity(),
            participants: self.roster.participants().to_vec(),
            transcript: self.transcript.messages().to_vec(),
            is_loading: self.is_loading,
            last_error: self.last_error.clone(),
            own_sender_id: self.echoes.own_sender_id().map(str::to_string),
        }
    }

    fn roster_event(&self) -> SessionEvent {
        SessionEvent::RosterChanged {
            capacity: self.roster.capacity(),
            participants: self.roster.participants().to_vec(),
        }
    }

    /// Apply one decoded inbound frame to roster and transcript.
    pub(crate) fn route(&mut self, event: DecodedEvent) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let Some(change) = MembershipEvent::from_decoded(&event) {
            if self.roster.apply(change) {
                events.push(self.roster_event());
            }
        }

        if let DecodedEvent::Message(message) = event {
            let roster_id = self.roster.unique_id_for(self.echoes.display_name());
            if self.echoes.reconcile(&message, roster_id) {
                tracing::debug!(id = %message.id, "server copy of local echo suppressed");
            } else if self.transcript.append(message.clone()) {
                events.push(SessionEvent::MessageAppended(message));
            } else {
                tracing::debug!(id = %message.id, "duplicate message id ignored");
            }
        }

        events
    }
}

pub(crate) struct SharedState {
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SharedState {
    pub(crate) fn new(state: SessionState, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            inner: Mutex::new(state),
            events,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn emit_all(&self, events: Vec<SessionEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Set the status if the status differs, emitting a change event.
    pub(crate) fn set_status_locked(&self, state: &mut SessionState, status: ConnectionStatus) {
        if state.status != status {
            state.status = status.clone();
            self.emit(SessionEvent::StatusChanged(status));
        }
    }

    pub(crate) fn set_error_locked(&self, state: &mut SessionState, message: &str) {
        state.last_error = Some(message.to_string());
        self.emit(SessionEvent::Error(message.to_string()));
    }

    /// Move to `status` on behalf of the connection started under `epoch`.
    /// Returns false if that connection has been superseded.
    pub(crate) fn transition(&self, epoch: u64, status: ConnectionStatus) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            return false;
        }
        self.set_status_locked(&mut state, status);
        true
    }

    /// The socket is open and the join frame went out.
    pub(crate) fn opened(&self, epoch: u64, outbound: UnboundedSender<String>) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            return false;
        }
        state.outbound = Some(outbound);
        state.is_loading = false;
        state.last_error = None;
        self.set_status_locked(&mut state, ConnectionStatus::Open);
        true
    }

    /// The socket failed to open or dropped; a retry follows.
    pub(crate) fn lost(&self, epoch: u64, message: &str, attempt: u32) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            return false;
        }
        state.outbound = None;
        state.is_loading = false;
        self.set_error_locked(&mut state, message);
        self.set_status_locked(&mut state, ConnectionStatus::Reconnecting { attempt });
        true
    }

    /// Apply an inbound frame received by the connection under `epoch`.
    pub(crate) fn apply(&self, epoch: u64, event: DecodedEvent) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            return false;
        }
        let events = state.route(event);
        drop(state);
        self.emit_all(events);
        true
    }
}

//! The session facade: one client, one room.

use std::path::Path;
use std::sync::Arc;

use anonchat_shared::{codec, FileInfo, Message, OutboundIntent, Participant};
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::echo::OptimisticEchoBuffer;
use crate::error::{ConfigError, SendError};
use crate::file_transfer::FileTransferEncoder;
use crate::state::{SessionEvent, SessionSnapshot, SessionState, SharedState};
use crate::ws::{ConnectionManager, ConnectionStatus, Connector, TungsteniteConnector};

/// Public surface of the session client.
///
/// Reads return snapshots; the only mutations available to callers are
/// `send`, `send_file`, `connect` and `close`.
pub struct ChatSession {
    room_id: String,
    display_name: String,
    shared: Arc<SharedState>,
    connection: ConnectionManager,
    files: FileTransferEncoder,
    // one file encode in flight at a time
    file_slot: tokio::sync::Mutex<()>,
}

impl ChatSession {
    /// Session over a real websocket. Call [`connect`](Self::connect) to open it.
    pub fn new(
        room_id: impl Into<String>,
        display_name: impl Into<String>,
        config: &ClientConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_connector(room_id, display_name, config, Arc::new(TungsteniteConnector))
    }

    pub fn with_connector(
        room_id: impl Into<String>,
        display_name: impl Into<String>,
        config: &ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ConfigError> {
        let room_id = room_id.into();
        let display_name = display_name.into();
        let room_url = config.room_url(&room_id)?;

        let echoes = OptimisticEchoBuffer::new(&room_id, &display_name, config.echo_window());
        let shared = Arc::new(SharedState::new(
            SessionState::new(echoes),
            config.event_buffer,
        ));
        let connection = ConnectionManager::new(
            room_url,
            display_name.clone(),
            connector,
            config.reconnect_config(),
            shared.clone(),
        );

        Ok(Self {
            room_id,
            display_name,
            shared,
            connection,
            files: FileTransferEncoder::new(config.file_size_limit()),
            file_slot: tokio::sync::Mutex::new(()),
        })
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn room_url(&self) -> &str {
        self.connection.room_url()
    }

    /// Open the room channel. Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        self.connection.connect();
    }

    /// Leave the room. No reconnect is attempted afterwards.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Send a text message. On success the optimistic echo, already in the
    /// transcript, is returned.
    ///
    /// Whitespace-only text is rejected; anything else goes out unchanged.
    pub fn send(&self, text: &str) -> Result<Message, SendError> {
        if text.trim().is_empty() {
            return Err(SendError::Empty);
        }
        self.dispatch(OutboundIntent::text(text))
    }

    /// Read, encode and send a local file.
    pub async fn send_file(&self, path: impl AsRef<Path>) -> Result<Message, SendError> {
        if !self.status().is_open() {
            self.record_error(&SendError::NotConnected);
            return Err(SendError::NotConnected);
        }
        let _slot = self.file_slot.try_lock().map_err(|_| SendError::Busy)?;

        let file_info = match self.files.encode_path(path.as_ref()).await {
            Ok(info) => info,
            Err(error) => {
                tracing::warn!(room = %self.room_id, %error, "file could not be prepared");
                return Err(error.into());
            }
        };
        self.dispatch(OutboundIntent::file(file_info))
    }

    /// Send a file that has already been packaged. The configured size
    /// ceiling applies here too.
    pub fn send_file_info(&self, file_info: FileInfo) -> Result<Message, SendError> {
        self.files.check_file_info(&file_info)?;
        self.dispatch(OutboundIntent::file(file_info))
    }

    fn dispatch(&self, intent: OutboundIntent) -> Result<Message, SendError> {
        let frame = codec::encode(&intent)?;

        let mut state = self.shared.lock();
        if let Err(error) = self.connection.transmit(&state, frame) {
            tracing::debug!(room = %self.room_id, %error, "send rejected");
            self.shared.set_error_locked(&mut state, &error.to_string());
            return Err(error);
        }
        let message = state.echoes.echo(&intent);
        state.transcript.append(message.clone());
        drop(state);

        self.shared
            .emit(SessionEvent::MessageAppended(message.clone()));
        Ok(message)
    }

    fn record_error(&self, error: &SendError) {
        let mut state = self.shared.lock();
        self.shared.set_error_locked(&mut state, &error.to_string());
    }

    pub fn state(&self) -> SessionSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock().status.clone()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.shared.lock().transcript.messages().to_vec()
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.shared.lock().roster.participants().to_vec()
    }

    pub fn room_capacity(&self) -> u32 {
        self.shared.lock().roster.capacity()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }

    /// True for local echoes and for server copies carrying this client's
    /// sender id, once that id has been learned.
    pub fn is_own_message(&self, message: &Message) -> bool {
        self.shared.lock().echoes.is_own(message)
    }

    /// Change notifications. Slow receivers see `RecvError::Lagged` rather
    /// than blocking the connection.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.subscribe()
    }
}

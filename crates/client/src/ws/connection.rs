//! Room connection with state management and auto-reconnect.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anonchat_shared::{codec, OutboundIntent};
use futures_channel::mpsc::unbounded;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::transport::{Connector, FrameChannel};
use crate::error::{SendError, TransportError};
use crate::state::{SessionState, SharedState};

pub const ERROR_SOCKET: &str = "WebSocket error occurred";
pub const ERROR_CONNECT: &str = "Failed to connect to chat server";
pub const ERROR_CONNECTION_LOST: &str = "Connection lost, reconnecting";

/// Connection state for a room session.
///
/// `Idle → Connecting → Open`; an abnormal close moves to `Reconnecting`
/// and back to `Connecting` after the retry delay. `Closed` is only reached
/// through an intentional `close()`; no retry leaves it, only a new `connect()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Open,
    Reconnecting { attempt: u32 },
    Closed,
}

impl ConnectionStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionStatus::Open)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connecting | ConnectionStatus::Reconnecting { .. }
        )
    }

    /// A connection is open, being opened, or scheduled to be retried.
    pub fn is_active(&self) -> bool {
        self.is_open() || self.is_connecting()
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Idle => write!(f, "idle"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Open => write!(f, "connected"),
            ConnectionStatus::Reconnecting { attempt } => {
                write!(f, "reconnecting (attempt {attempt})")
            }
            ConnectionStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Reconnect behaviour: a fixed delay, retried until `close()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
        }
    }
}

struct ActiveDriver {
    shutdown: Arc<Notify>,
    _handle: JoinHandle<()>,
}

/// Owns the socket lifecycle for one room.
pub struct ConnectionManager {
    room_url: String,
    display_name: String,
    connector: Arc<dyn Connector>,
    reconnect: ReconnectConfig,
    shared: Arc<SharedState>,
    active: Mutex<Option<ActiveDriver>>,
}

impl ConnectionManager {
    pub(crate) fn new(
        room_url: String,
        display_name: String,
        connector: Arc<dyn Connector>,
        reconnect: ReconnectConfig,
        shared: Arc<SharedState>,
    ) -> Self {
        Self {
            room_url,
            display_name,
            connector,
            reconnect,
            shared,
            active: Mutex::new(None),
        }
    }

    pub fn room_url(&self) -> &str {
        &self.room_url
    }

    /// Start connecting. A no-op while a connection is open, being opened,
    /// or waiting to be retried.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let epoch = {
            let mut state = self.shared.lock();
            if state.status.is_active() {
                tracing::debug!(
                    status = %state.status,
                    "connect ignored, connection already active"
                );
                return;
            }
            state.epoch += 1;
            self.shared
                .set_status_locked(&mut state, ConnectionStatus::Connecting);
            state.epoch
        };

        if let Some(previous) = active.take() {
            previous.shutdown.notify_one();
        }

        let shutdown = Arc::new(Notify::new());
        let driver = Driver {
            room_url: self.room_url.clone(),
            display_name: self.display_name.clone(),
            connector: self.connector.clone(),
            reconnect: self.reconnect.clone(),
            shared: self.shared.clone(),
            epoch,
            shutdown: shutdown.clone(),
        };
        tracing::info!(url = %self.room_url, epoch, "connecting");
        let handle = tokio::spawn(driver.run());
        *active = Some(ActiveDriver {
            shutdown,
            _handle: handle,
        });
    }

    /// Intentional teardown: cancels any pending retry, closes the socket
    /// and leaves the session in the terminal `Closed` state.
    pub fn close(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.shared.lock();
            // bumping the epoch invalidates every callback of the old driver
            state.epoch += 1;
            state.outbound = None;
            self.shared
                .set_status_locked(&mut state, ConnectionStatus::Closed);
        }
        if let Some(driver) = active.take() {
            driver.shutdown.notify_one();
            tracing::info!(url = %self.room_url, "connection closed");
        }
    }

    /// Queue a frame on the open socket. Fails without queueing if the
    /// connection is not open.
    pub(crate) fn transmit(&self, state: &SessionState, frame: String) -> Result<(), SendError> {
        if !state.status.is_open() {
            return Err(SendError::NotConnected);
        }
        let Some(outbound) = state.outbound.as_ref() else {
            return Err(SendError::NotConnected);
        };
        outbound
            .unbounded_send(frame)
            .map_err(|_| SendError::NotConnected)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let has_driver = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        if has_driver {
            self.close();
        }
    }
}

enum PumpEnd {
    Shutdown,
    Superseded,
    ClosedByPeer,
    Errored(TransportError),
}

/// Background task serving one `connect()` call, across reconnects.
struct Driver {
    room_url: String,
    display_name: String,
    connector: Arc<dyn Connector>,
    reconnect: ReconnectConfig,
    shared: Arc<SharedState>,
    epoch: u64,
    shutdown: Arc<Notify>,
}

impl Driver {
    async fn run(self) {
        let mut attempt = 0u32;

        loop {
            let connected = tokio::select! {
                _ = self.shutdown.notified() => return,
                result = self.connector.connect(&self.room_url) => result,
            };

            let reason = match connected {
                Ok(channel) => {
                    attempt = 0;
                    match self.pump(channel).await {
                        PumpEnd::Shutdown | PumpEnd::Superseded => return,
                        PumpEnd::ClosedByPeer => {
                            tracing::info!(url = %self.room_url, "connection closed by server");
                            ERROR_CONNECTION_LOST
                        }
                        PumpEnd::Errored(error) => {
                            tracing::warn!(url = %self.room_url, %error, "connection error");
                            ERROR_SOCKET
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(url = %self.room_url, %error, "connection attempt failed");
                    ERROR_CONNECT
                }
            };

            attempt += 1;
            if !self.shared.lost(self.epoch, reason, attempt) {
                return;
            }

            tracing::info!(
                url = %self.room_url,
                delay_ms = self.reconnect.delay.as_millis() as u64,
                attempt,
                "reconnecting"
            );
            tokio::select! {
                _ = self.shutdown.notified() => return,
                _ = tokio::time::sleep(self.reconnect.delay) => {}
            }

            if !self
                .shared
                .transition(self.epoch, ConnectionStatus::Connecting)
            {
                tracing::debug!(epoch = self.epoch, "stale retry dropped");
                return;
            }
        }
    }

    /// Join, then shuttle frames until the channel ends.
    async fn pump(&self, channel: FrameChannel) -> PumpEnd {
        let FrameChannel {
            mut sink,
            mut stream,
        } = channel;

        // the join frame goes out before any application traffic
        let join = match codec::encode(&OutboundIntent::join(self.display_name.as_str())) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::error!(%error, "failed to encode join frame");
                let _ = sink.close().await;
                return PumpEnd::Shutdown;
            }
        };
        if let Err(error) = sink.send(join).await {
            return PumpEnd::Errored(error);
        }

        let (outbound_tx, mut outbound_rx) = unbounded::<String>();
        if !self.shared.opened(self.epoch, outbound_tx) {
            let _ = sink.close().await;
            return PumpEnd::Superseded;
        }
        tracing::info!(url = %self.room_url, epoch = self.epoch, "connected");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    let _ = sink.close().await;
                    return PumpEnd::Shutdown;
                }
                inbound = stream.next() => match inbound {
                    Some(Ok(text)) => {
                        let event = codec::decode(&text);
                        if !self.shared.apply(self.epoch, event) {
                            let _ = sink.close().await;
                            return PumpEnd::Superseded;
                        }
                    }
                    Some(Err(TransportError::ClosedByPeer)) | None => return PumpEnd::ClosedByPeer,
                    Some(Err(error)) => {
                        let _ = sink.close().await;
                        return PumpEnd::Errored(error);
                    }
                },
                Some(frame) = outbound_rx.next() => {
                    if let Err(error) = sink.send(frame).await {
                        return PumpEnd::Errored(error);
                    }
                }
            }
        }
    }
}

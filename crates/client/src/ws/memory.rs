//! In-process transport. Each `connect` produces a [`MemoryPeer`] that plays
//! the server end of the channel; useful for embedding a session next to an
//! in-process room and for driving sessions in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::transport::{Connector, FrameChannel};
use crate::error::TransportError;

/// Server end of one in-memory connection.
pub struct MemoryPeer {
    pub url: String,
    from_client: UnboundedReceiver<String>,
    to_client: UnboundedSender<Result<String, TransportError>>,
}

impl MemoryPeer {
    /// Next frame sent by the client; `None` once the client has hung up.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Push a frame to the client. Returns false if the client is gone.
    pub fn send(&self, frame: impl Into<String>) -> bool {
        self.to_client.unbounded_send(Ok(frame.into())).is_ok()
    }

    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        self.send(value.to_string())
    }

    /// Fail the channel with a transport error.
    pub fn fail(&self) -> bool {
        self.to_client
            .unbounded_send(Err(TransportError::ChannelClosed))
            .is_ok()
    }

    /// Close the channel from the server side.
    pub fn close(self) {
        self.to_client.close_channel();
    }
}

#[derive(Default)]
struct Counters {
    attempts: AtomicUsize,
    refuse: AtomicUsize,
}

/// Accepts the server ends of connections made through a [`MemoryConnector`].
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryListener {
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// A peer that has already connected, without waiting.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }
}

#[derive(Clone)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    counters: Arc<Counters>,
}

impl MemoryConnector {
    pub fn pair() -> (Self, MemoryListener) {
        let (peers, rx) = mpsc::unbounded_channel();
        (
            Self {
                peers,
                counters: Arc::new(Counters::default()),
            },
            MemoryListener { peers: rx },
        )
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_next(&self, count: usize) {
        self.counters.refuse.store(count, Ordering::SeqCst);
    }

    /// Number of connection attempts made so far, refused ones included.
    pub fn attempts(&self) -> usize {
        self.counters.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<FrameChannel, TransportError> {
        self.counters.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .counters
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let (client_tx, from_client) = unbounded::<String>();
        let (to_client, client_rx) = unbounded::<Result<String, TransportError>>();

        let peer = MemoryPeer {
            url: url.to_string(),
            from_client,
            to_client,
        };
        if self.peers.send(peer).is_err() {
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "listener dropped".to_string(),
            });
        }

        Ok(FrameChannel {
            sink: Box::pin(client_tx.sink_map_err(|_| TransportError::ChannelClosed)),
            stream: Box::pin(client_rx),
        })
    }
}

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anonchat_client::ws::{MemoryListener, MemoryPeer};
use anonchat_client::{ChatSession, ClientConfig, MemoryConnector};
use serde_json::{json, Value};

pub const ROOM: &str = "abcd";
pub const NAME: &str = "alice";

pub fn test_config() -> ClientConfig {
    ClientConfig {
        api_base_url: "http://chat.test".to_string(),
        ..ClientConfig::default()
    }
}

pub async fn within<F: Future>(future: F) -> anyhow::Result<F::Output> {
    Ok(tokio::time::timeout(Duration::from_secs(2), future).await?)
}

/// Poll `condition` until it holds, yielding to the session tasks between
/// checks.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("condition not met in time");
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    Ok(())
}

pub struct Harness {
    pub session: ChatSession,
    pub connector: MemoryConnector,
    pub listener: MemoryListener,
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: ClientConfig) -> Harness {
    let (connector, listener) = MemoryConnector::pair();
    let session = ChatSession::with_connector(ROOM, NAME, &config, Arc::new(connector.clone()))
        .expect("valid config");
    Harness {
        session,
        connector,
        listener,
    }
}

impl Harness {
    /// Accept the next connection, consume its join frame and wait for the
    /// session to report it open.
    pub async fn accept_open(&mut self) -> anyhow::Result<MemoryPeer> {
        let mut peer = within(self.listener.accept())
            .await?
            .ok_or_else(|| anyhow::anyhow!("connector dropped"))?;
        let join = within(peer.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("no join frame"))?;
        anyhow::ensure!(join.contains("\"join\""), "expected join frame, got {join}");
        wait_until(|| self.session.status().is_open()).await?;
        Ok(peer)
    }

    pub async fn connected(&mut self) -> anyhow::Result<MemoryPeer> {
        self.session.connect();
        self.accept_open().await
    }
}

pub fn chat_message(id: &str, sender_id: &str, sender_name: &str, content: &str) -> Value {
    json!({
        "id": id,
        "chat_id": ROOM,
        "sender_id": sender_id,
        "sender_name": sender_name,
        "content": content,
        "message_type": "Text",
        "timestamp": "2024-05-01T12:00:00Z",
    })
}

pub fn chat_info(max_participants: u32, participants: &[(&str, &str)]) -> Value {
    let participants: Vec<Value> = participants
        .iter()
        .map(|(id, username)| json!({ "id": id, "username": username }))
        .collect();
    json!({
        "type": "chat_info",
        "max_participants": max_participants,
        "participants": participants,
    })
}

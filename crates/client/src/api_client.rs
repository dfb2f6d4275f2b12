//! HTTP client for the room-creation API.

use anonchat_shared::{ApiError, CreateRoomRequest, CreateRoomResponse};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: String::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new().with_base_url(config.api_base_url.clone())
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        if self.base_url.is_empty() {
            format!("/{path}")
        } else {
            format!("{}/{path}", self.base_url.trim_end_matches('/'))
        }
    }

    /// Create a room for up to `max_participants` people.
    pub async fn create_room(&self, max_participants: u32) -> Result<CreateRoomResponse, ApiError> {
        let room: CreateRoomResponse = self
            .post_json("/chat", &CreateRoomRequest { max_participants })
            .await?;
        tracing::info!(
            room = %room.chat_id,
            max_participants = room.max_participants,
            "room created"
        );
        Ok(room)
    }

    async fn post_json<TReq: Serialize, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let url = self.url(path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if !is_success {
            tracing::warn!(%url, status, "api request failed");
            return Err(ApiError::Http { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_path() {
        let api = ApiClient::new().with_base_url("https://api.example.org/");
        assert_eq!(api.url("/chat"), "https://api.example.org/chat");
        assert_eq!(api.url("chat"), "https://api.example.org/chat");
    }

    #[test]
    fn absolute_urls_pass_through() {
        let api = ApiClient::new().with_base_url("https://api.example.org");
        assert_eq!(api.url("http://other.test/chat"), "http://other.test/chat");
    }

    #[test]
    fn relative_without_base() {
        assert_eq!(ApiClient::new().url("chat"), "/chat");
    }

    #[test]
    fn base_from_config() {
        let config = ClientConfig {
            api_base_url: "http://localhost:8000".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(ApiClient::from_config(&config).url("/chat"), "http://localhost:8000/chat");
    }
}

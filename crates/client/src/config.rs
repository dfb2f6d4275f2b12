//! Client configuration.
//!
//! Read from `anonchat/config.json` in the platform config directory:
//! - Linux: `~/.config/anonchat/`
//! - macOS: `~/Library/Application Support/anonchat/`
//! - Windows: `%APPDATA%\anonchat\`
//!
//! A missing file means defaults. `ANONCHAT_API_URL` and `ANONCHAT_WS_URL`
//! override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::ws::ReconnectConfig;

pub const CONFIG_DIR_NAME: &str = "anonchat";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_API_URL: &str = "ANONCHAT_API_URL";
pub const ENV_WS_URL: &str = "ANONCHAT_WS_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the chat HTTP API (room creation).
    pub api_base_url: String,
    /// Base URL of the websocket endpoint. Derived from `api_base_url` when unset.
    pub ws_base_url: Option<String>,
    /// Path prefix under which room channels live.
    pub ws_path_prefix: String,
    /// Fixed delay before reconnecting after an abnormal close.
    pub reconnect_delay_ms: u64,
    /// Largest file accepted by `send_file`; 0 disables the check.
    pub max_file_bytes: u64,
    /// How long a local echo waits to be matched by the server's copy.
    pub echo_window_ms: u64,
    /// Capacity of the session event broadcast channel.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.anonchat.space".to_string(),
            ws_base_url: None,
            ws_path_prefix: "/api/ws".to_string(),
            reconnect_delay_ms: 3000,
            max_file_bytes: 10 * 1024 * 1024,
            echo_window_ms: 10_000,
            event_buffer: 256,
        }
    }
}

impl ClientConfig {
    /// Location of the config file, if the platform has a config directory.
    pub fn config_path() -> Option<PathBuf> {
        Some(
            dirs::config_dir()?
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        )
    }

    /// Load from the platform config file (if any), then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_path(&path)?,
            Some(path) => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Load an explicit config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides looked up by environment variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(api) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_base_url = api;
        }
        if let Some(ws) = lookup(ENV_WS_URL).filter(|v| !v.is_empty()) {
            self.ws_base_url = Some(ws);
        }
        self
    }

    /// Websocket base, e.g. `wss://api.anonchat.space`.
    pub fn ws_base(&self) -> Result<String, ConfigError> {
        if let Some(ws) = &self.ws_base_url {
            return Ok(ws.trim_end_matches('/').to_string());
        }
        let mut url = Url::parse(&self.api_base_url).map_err(|source| ConfigError::Url {
            url: self.api_base_url.clone(),
            source,
        })?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        // http(s) -> ws(s) is always permitted by the url crate
        let _ = url.set_scheme(scheme);
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    /// Channel URL for a room: `{ws_base}{prefix}/{roomId}`.
    pub fn room_url(&self, room_id: &str) -> Result<String, ConfigError> {
        let prefix = self.ws_path_prefix.trim_end_matches('/');
        Ok(format!(
            "{}{}/{}",
            self.ws_base()?,
            prefix,
            urlencoding::encode(room_id)
        ))
    }

    pub fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }

    pub fn file_size_limit(&self) -> Option<u64> {
        (self.max_file_bytes > 0).then_some(self.max_file_bytes)
    }

    pub fn echo_window(&self) -> Duration {
        Duration::from_millis(self.echo_window_ms)
    }
}

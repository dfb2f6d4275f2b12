//! Client-side error types.

use std::path::PathBuf;

use anonchat_shared::CodecError;
use thiserror::Error;

/// Failure of the underlying real-time channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed by peer")]
    ClosedByPeer,
    #[error("channel closed")]
    ChannelClosed,
}

/// Failure turning a local file into a file message.
#[derive(Debug, Error)]
pub enum FileTransferError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a regular file", .path.display())]
    NotAFile { path: PathBuf },
    #[error("{name} is {size} bytes, above the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("invalid data url: {0}")]
    InvalidDataUrl(String),
}

/// Why a `send` did not go out.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Not connected to chat server")]
    NotConnected,
    #[error("message is empty")]
    Empty,
    #[error("a file is already being sent")]
    Busy,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    File(#[from] FileTransferError),
}

/// Failure loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

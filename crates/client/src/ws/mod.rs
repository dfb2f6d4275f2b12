//! Real-time channel to a chat room.
//!
//! ```text
//!   ChatSession ──send──▶ ConnectionManager ──frames──▶ Connector (websocket / memory)
//!        ▲                       │
//!        │                  decode + route
//!        └──── SharedState ◀─────┘  (roster, transcript, status)
//! ```
//!
//! [`ConnectionManager`] owns the socket lifecycle: connect, join, pump
//! frames, retry after a fixed delay on abnormal close, and terminal
//! teardown on `close()`. The transport itself sits behind [`Connector`]
//! so the same manager runs over tokio-tungstenite or an in-process pipe.

mod connection;
pub mod memory;
mod transport;

pub use connection::{ConnectionManager, ConnectionStatus, ReconnectConfig};
pub use memory::{MemoryConnector, MemoryListener, MemoryPeer};
pub use transport::{Connector, FrameChannel, FrameSink, FrameStream, TungsteniteConnector};

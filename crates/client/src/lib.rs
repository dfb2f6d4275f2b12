//! anonchat session client
//!
//! Owns the real-time connection to one chat room and keeps a consistent
//! local view of it: the message transcript, the participant roster and the
//! connection health. Reconnects on a fixed delay after transient failures.

pub mod api_client;
pub mod config;
pub mod echo;
pub mod error;
pub mod file_transfer;
pub mod logging;
pub mod roster;
pub mod session;
mod state;
pub mod transcript;
pub mod ws;

pub use api_client::ApiClient;
pub use config::ClientConfig;
pub use echo::OptimisticEchoBuffer;
pub use error::{ConfigError, FileTransferError, SendError, TransportError};
pub use file_transfer::FileTransferEncoder;
pub use roster::{MembershipEvent, RosterTracker};
pub use session::ChatSession;
pub use state::{SessionEvent, SessionSnapshot};
pub use transcript::Transcript;
pub use ws::{ConnectionStatus, Connector, MemoryConnector, ReconnectConfig};

use rand::distributions::Alphanumeric;
use rand::Rng;

const DISPLAY_NAME_LEN: usize = 7;

/// Short lowercase handle for users that did not pick a name.
pub fn random_display_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DISPLAY_NAME_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_names_are_short_lowercase() {
        let name = random_display_name();
        assert_eq!(name.len(), DISPLAY_NAME_LEN);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}

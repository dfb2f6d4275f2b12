//! Shared types for the anonchat session client: domain records, wire frames
//! and the codec translating between them.

pub mod codec;
pub mod error;
pub mod models;
pub mod protocol;

pub use codec::{decode, encode, parse_timestamp, try_decode, DecodedEvent, OutboundIntent};
pub use error::*;
pub use models::*;
pub use protocol::*;

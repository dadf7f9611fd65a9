//! Inbound side of the Second Life / OpenSim protocol as seen by the avatar core
//!
//! Envelope parsing and circuit handling happen elsewhere; this module only
//! deals with already-assembled messages: a template-style message reader,
//! the typed avatar events pulled out of those messages, and the fixed-layout
//! pose codec used by terse updates.

pub mod message;
pub mod packets;
pub mod serialization;

pub use message::{InboundMessage, MessageBuilder, MessageReader};
pub use packets::InboundEvent;

// Error types
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("Packet decode failed: {reason}")]
    PacketDecode { reason: String },

    #[error("Field not found: {name}")]
    FieldNotFound { name: String },

    #[error("Invalid buffer length: expected {expected}, got {actual}")]
    InvalidBufferLength { expected: usize, actual: usize },
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        NetworkError::PacketDecode { reason: err.to_string() }
    }
}

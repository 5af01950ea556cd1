//! Error types for sockio
//!
//! Every protocol anomaly the client can run into has its own variant so that
//! callers (and logs) can tell them apart. Almost all of them are recoverable:
//! the client logs them, counts them in metrics and keeps processing frames.
//!
//! # Error Categories
//!
//! - **Wire errors**: MalformedPacket, PayloadParse
//! - **Dispatch errors**: InvalidEventPayload, UnknownAcknowledgement, UnregisteredHandler
//! - **Transport errors**: TransportSend, Transport, ConnectionClosed
//! - **Processing errors**: Serialization, Internal
//!
//! # Examples
//!
//! ```rust
//! use sockio_core::Error;
//!
//! let error = Error::UnknownAcknowledgement(42);
//! assert_eq!(error.kind(), "unknown_ack");
//! assert_eq!(error.to_string(), "Acknowledgement for unknown id: 42");
//! ```

use thiserror::Error;

/// Result type for sockio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sockio operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The decoder could not determine the outer packet kind
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// The JSON payload of a frame failed to parse
    ///
    /// Never fatal for decoding: the packet is still produced, without payload.
    #[error("Payload parse failure: {0}")]
    PayloadParse(String),

    /// An EVENT payload did not have the `[name]` / `[name, argument]` shape
    #[error("Invalid event payload: {0}")]
    InvalidEventPayload(String),

    /// An ACK arrived for an id with no pending callback
    #[error("Acknowledgement for unknown id: {0}")]
    UnknownAcknowledgement(u64),

    /// `off` was called for a handler that is not registered
    #[error("No handler registered for event: {event}")]
    UnregisteredHandler {
        /// Event name passed to `off`
        event: String,
    },

    /// The transport rejected an outgoing frame
    #[error("Transport send failure: {0}")]
    TransportSend(String),

    /// Opening or running the underlying connection failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// A caller-supplied value could not be serialized to JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The connection is not open
    #[error("Connection closed")]
    ConnectionClosed,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short, stable label used for log fields and metric attributes
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedPacket(_) => "malformed_packet",
            Error::PayloadParse(_) => "payload_parse",
            Error::InvalidEventPayload(_) => "invalid_event_payload",
            Error::UnknownAcknowledgement(_) => "unknown_ack",
            Error::UnregisteredHandler { .. } => "unregistered_handler",
            Error::TransportSend(_) => "transport_send",
            Error::Transport(_) => "transport",
            Error::Serialization(_) => "serialization",
            Error::ConnectionClosed => "connection_closed",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

//! Socket.IO packet model
//!
//! A Socket.IO frame travels inside an Engine.IO envelope. The envelope
//! carries the transport-level kind (open, close, ping, message, ...); when
//! the envelope is a `MESSAGE`, a second digit carries the socket-level kind
//! (connect, event, ack, ...) followed by optional namespace, correlation id
//! and a JSON payload.
//!
//! # Wire Shape
//!
//! ```text
//! <transport digit>[<socket digit>][<attachments>-][<namespace>,][<id>][<json>]
//! ```
//!
//! For example `42/chat,12["hello",1]` is a `MESSAGE`/`EVENT` packet on the
//! `/chat` namespace with id `12` and payload `["hello",1]`.
//!
//! # Immutability
//!
//! Fields are private. A `Packet` is built once (by the decoder or through
//! the constructors below) and read through accessors afterwards; the codec
//! never edits a packet in place.

use serde_json::Value;
use std::fmt;

/// Namespace used when the wire form does not name one
pub const DEFAULT_NAMESPACE: &str = "/";

/// Outer Engine.IO envelope type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportPacketKind {
    /// Handshake from the server, payload carries the session id
    Open,
    /// Transport is being closed
    Close,
    /// Heartbeat probe
    Ping,
    /// Heartbeat reply
    Pong,
    /// Carries a Socket.IO packet
    Message,
    /// Transport upgrade
    Upgrade,
    /// No operation
    Noop,
    /// Digit outside the known range
    Unknown,
}

impl TransportPacketKind {
    /// Map a wire digit (0-9) to a kind; digits above 6 are `Unknown`
    pub fn from_digit(digit: u8) -> Self {
        match digit {
            0 => Self::Open,
            1 => Self::Close,
            2 => Self::Ping,
            3 => Self::Pong,
            4 => Self::Message,
            5 => Self::Upgrade,
            6 => Self::Noop,
            _ => Self::Unknown,
        }
    }

    /// Wire digit for this kind, `None` for `Unknown`
    pub fn digit(self) -> Option<u8> {
        match self {
            Self::Open => Some(0),
            Self::Close => Some(1),
            Self::Ping => Some(2),
            Self::Pong => Some(3),
            Self::Message => Some(4),
            Self::Upgrade => Some(5),
            Self::Noop => Some(6),
            Self::Unknown => None,
        }
    }
}

/// Inner Socket.IO packet type, meaningful only inside a `MESSAGE` envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    Error,
    BinaryEvent,
    BinaryAck,
    Unknown,
}

impl SocketPacketKind {
    /// Map a wire digit (0-9) to a kind; digits above 6 are `Unknown`
    pub fn from_digit(digit: u8) -> Self {
        match digit {
            0 => Self::Connect,
            1 => Self::Disconnect,
            2 => Self::Event,
            3 => Self::Ack,
            4 => Self::Error,
            5 => Self::BinaryEvent,
            6 => Self::BinaryAck,
            _ => Self::Unknown,
        }
    }

    /// Wire digit for this kind, `None` for `Unknown`
    pub fn digit(self) -> Option<u8> {
        match self {
            Self::Connect => Some(0),
            Self::Disconnect => Some(1),
            Self::Event => Some(2),
            Self::Ack => Some(3),
            Self::Error => Some(4),
            Self::BinaryEvent => Some(5),
            Self::BinaryAck => Some(6),
            Self::Unknown => None,
        }
    }

    /// Whether the wire form carries an attachment count
    pub fn is_binary(self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

/// One protocol frame
///
/// Absent ids and attachment counts are `None` (the protocol's `-1`).
/// The namespace is never empty; it falls back to [`DEFAULT_NAMESPACE`].
///
/// # Examples
///
/// ```rust
/// use sockio_core::{Packet, SocketPacketKind, TransportPacketKind};
/// use serde_json::json;
///
/// let packet = Packet::event(json!(["hello"])).with_id(7);
/// assert_eq!(packet.transport_kind(), TransportPacketKind::Message);
/// assert_eq!(packet.socket_kind(), Some(SocketPacketKind::Event));
/// assert_eq!(packet.id(), Some(7));
/// assert_eq!(packet.namespace(), "/");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    transport_kind: TransportPacketKind,
    socket_kind: Option<SocketPacketKind>,
    attachments: Option<u64>,
    namespace: String,
    id: Option<u64>,
    payload: Option<Value>,
}

impl Packet {
    /// Create a bare packet of the given transport kind
    pub fn new(transport_kind: TransportPacketKind) -> Self {
        Self {
            transport_kind,
            socket_kind: None,
            attachments: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            id: None,
            payload: None,
        }
    }

    /// Create a `MESSAGE` packet carrying the given socket kind
    pub fn message(socket_kind: SocketPacketKind) -> Self {
        Self::new(TransportPacketKind::Message).with_socket_kind(socket_kind)
    }

    /// Create a `MESSAGE`/`EVENT` packet with the given payload array
    pub fn event(payload: Value) -> Self {
        Self::message(SocketPacketKind::Event).with_payload(payload)
    }

    pub fn with_socket_kind(mut self, kind: SocketPacketKind) -> Self {
        self.socket_kind = Some(kind);
        self
    }

    pub fn with_attachments(mut self, count: u64) -> Self {
        self.attachments = Some(count);
        self
    }

    /// Set the namespace; an empty string keeps the default `/`
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !namespace.is_empty() {
            self.namespace = namespace;
        }
        self
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn transport_kind(&self) -> TransportPacketKind {
        self.transport_kind
    }

    pub fn socket_kind(&self) -> Option<SocketPacketKind> {
        self.socket_kind
    }

    pub fn attachments(&self) -> Option<u64> {
        self.attachments
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Consume the packet and take its payload
    pub fn into_payload(self) -> Option<Value> {
        self.payload
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Packet: transport={:?}", self.transport_kind)?;
        if let Some(kind) = self.socket_kind {
            write!(f, ", socket={:?}", kind)?;
        }
        if let Some(count) = self.attachments {
            write!(f, ", attachments={}", count)?;
        }
        write!(f, ", nsp={}", self.namespace)?;
        if let Some(id) = self.id {
            write!(f, ", id={}", id)?;
        }
        match &self.payload {
            Some(payload) => write!(f, ", payload={}]", payload),
            None => write!(f, "]"),
        }
    }
}

//! Socket.IO packet model and wire codec for sockio
//!
//! This crate holds the transport-agnostic half of the client:
//!
//! - **Packet**: the in-memory form of one protocol frame
//! - **Codec**: wire text to packet and back
//! - **Event**: extracting `(name, argument)` pairs from EVENT payloads
//! - **Error handling**: one error variant per protocol anomaly
//! - **Observability**: `tracing` subscriber and OpenTelemetry setup
//!
//! The `sockio-client` crate builds the runtime (dispatcher, acknowledgements,
//! connection supervision) on top of it.
//!
//! # Example
//!
//! ```rust
//! use sockio_core::{codec, event, SocketPacketKind};
//!
//! let packet = codec::decode(r#"42["chat",{"text":"hi"}]"#).unwrap();
//! assert_eq!(packet.socket_kind(), Some(SocketPacketKind::Event));
//!
//! let event = event::parse_event(packet.payload().unwrap()).unwrap();
//! assert_eq!(event.name, "chat");
//! ```

pub mod codec;
pub mod error;
pub mod event;
pub mod observability;
pub mod packet;

pub use error::{Error, Result};
pub use event::{parse_event, SocketEvent};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use packet::{Packet, SocketPacketKind, TransportPacketKind, DEFAULT_NAMESPACE};

//! sockio - a Socket.IO client core for host-driven event loops
//!
//! This is the convenience crate that re-exports the sockio sub-crates.
//!
//! # Architecture
//!
//! - **sockio-core**: packet model, wire codec, event parsing, errors,
//!   observability setup
//! - **sockio-client**: dispatcher, acknowledgements, connection supervisor,
//!   WebSocket transport, metrics
//!
//! Inbound frames are decoded and queued on the transport's task. Handlers
//! and acknowledgement callbacks run only when the host calls `drain()`,
//! typically once per tick of its own loop.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sockio::ClientBuilder;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("ws://localhost:4567/socket.io/?EIO=3&transport=websocket")
//!         .build()?;
//!
//!     client.on("score", |event| println!("score: {:?}", event.argument));
//!     client.connect()?;
//!
//!     client
//!         .emit_with_ack("hello", json!({"player": "p1"}), |reply| println!("ack: {:?}", reply))
//!         .await?;
//!
//!     loop {
//!         client.drain();
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```
//!
//! # Wire Codec Only
//!
//! ```rust
//! use sockio::core::{codec, SocketPacketKind};
//!
//! let packet = codec::decode(r#"42/chat,12["hello",1]"#).unwrap();
//! assert_eq!(packet.socket_kind(), Some(SocketPacketKind::Event));
//! assert_eq!(packet.namespace(), "/chat");
//! assert_eq!(packet.id(), Some(12));
//! assert_eq!(codec::encode(&packet), r#"42/chat,12["hello",1]"#);
//! ```

pub use sockio_client as client;
pub use sockio_core as core;

pub use sockio_client::{ClientBuilder, ConnectionState, SocketClient};
pub use sockio_core::{Error, Packet, Result, SocketEvent};

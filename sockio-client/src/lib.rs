//! Socket.IO client runtime
//!
//! Builds on `sockio-core`'s packet codec to provide a client that a host
//! application drives from its own loop:
//!
//! - **Dispatcher**: classifies inbound frames and queues events and
//!   acknowledgements until the host calls `drain()`
//! - **Emit / Ack**: outbound events with monotonically increasing packet ids
//!   and optional acknowledgement callbacks
//! - **Supervisor**: a background task that reconnects while the client
//!   wants to be connected
//! - **Transport**: a trait seam with a `tokio-tungstenite` implementation
//! - **Observability**: optional OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sockio_client::ClientBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("ws://localhost:4567/socket.io/?EIO=3&transport=websocket")
//!         .auto_connect(true)
//!         .build()?;
//!
//!     client.on("open", |_| println!("connected"));
//!     client.on("news", |event| println!("news: {:?}", event.argument));
//!
//!     client.emit_with("subscribe", "sports").await?;
//!
//!     loop {
//!         client.drain();
//!         tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     }
//! }
//! ```

mod ack;
mod client;
mod client_builder;
mod dispatcher;
mod handlers;
mod metrics;
mod reconnect;
mod supervisor;
mod transport;

pub use ack::{AckCallback, AckRegistry};
pub use client::SocketClient;
pub use client_builder::{ClientBuilder, DEFAULT_RECONNECT_DELAY, DEFAULT_URL};
pub use dispatcher::Dispatcher;
pub use handlers::{EventHandler, HandlerId, HandlerRegistry};
pub use metrics::ClientMetrics;
pub use reconnect::{ExponentialBackoff, FixedDelay, ReconnectionStrategy};
pub use supervisor::{ConnectionState, ConnectionSupervisor};
pub use transport::{Transport, TransportListener, WsTransport};

//! Socket.IO client facade
//!
//! `SocketClient` ties the pieces together: a [`Transport`], the
//! [`Dispatcher`] listening to it, and the [`ConnectionSupervisor`] keeping
//! it connected. The host drives it from its own loop:
//!
//! 1. Register handlers with [`on`](SocketClient::on)
//! 2. Call [`connect`](SocketClient::connect) once
//! 3. Call [`drain`](SocketClient::drain) every tick; handlers and ack
//!    callbacks only ever run inside `drain`
//! 4. Call [`close`](SocketClient::close) on shutdown
//!
//! # Examples
//!
//! ```rust,no_run
//! use sockio_client::ClientBuilder;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> sockio_core::Result<()> {
//!     let client = ClientBuilder::new("ws://localhost:4567/socket.io/?EIO=3&transport=websocket")
//!         .build()?;
//!
//!     client.on("chat", |event| println!("chat: {:?}", event.argument));
//!     client.connect()?;
//!
//!     client
//!         .emit_with_ack("join", json!({"room": "lobby"}), |reply| {
//!             println!("joined: {:?}", reply);
//!         })
//!         .await?;
//!
//!     let mut tick = tokio::time::interval(Duration::from_millis(16));
//!     for _ in 0..600 {
//!         tick.tick().await;
//!         client.drain();
//!     }
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

use crate::dispatcher::Dispatcher;
use crate::handlers::HandlerId;
use crate::supervisor::{ConnectionState, ConnectionSupervisor};
use crate::transport::Transport;
use crate::ClientBuilder;
use serde::Serialize;
use serde_json::Value;
use sockio_core::{Result, SocketEvent};
use std::sync::Arc;

/// Socket.IO client over a pluggable transport
pub struct SocketClient {
    pub(crate) url: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) supervisor: ConnectionSupervisor,
}

impl SocketClient {
    /// Start configuring a client for `url`
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start the connection supervisor
    ///
    /// Returns immediately; the connection is established in the
    /// background and an `"open"` event is queued once the server answers.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` when called outside a tokio runtime.
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    pub fn connect(&self) -> Result<()> {
        self.supervisor.start()
    }

    /// Stop reconnecting and close the connection
    ///
    /// The supervisor is stopped first so it cannot reconnect behind our
    /// back, then the disconnect frames are sent and the transport closed.
    /// Calling this more than once is harmless.
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    pub async fn close(&self) {
        self.supervisor.stop().await;

        if self.transport.is_connected() {
            self.dispatcher.send_disconnect().await;
            if let Err(e) = self.transport.close().await {
                tracing::warn!(error = %e, "Transport close failed");
            }
        }
    }

    /// Register a handler; see [`Dispatcher::on`]
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.dispatcher.on(event, handler)
    }

    /// Remove a handler; returns `false` if it was not registered
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.dispatcher.off(event, id)
    }

    pub async fn emit(&self, event: impl Into<String>) -> Result<u64> {
        self.dispatcher.emit(event).await
    }

    pub async fn emit_with<T: Serialize>(&self, event: impl Into<String>, data: T) -> Result<u64> {
        self.dispatcher.emit_with(event, data).await
    }

    pub async fn emit_ack<F>(&self, event: impl Into<String>, callback: F) -> Result<u64>
    where
        F: FnOnce(Option<Value>) + Send + 'static,
    {
        self.dispatcher.emit_ack(event, callback).await
    }

    pub async fn emit_with_ack<T, F>(
        &self,
        event: impl Into<String>,
        data: T,
        callback: F,
    ) -> Result<u64>
    where
        T: Serialize,
        F: FnOnce(Option<Value>) + Send + 'static,
    {
        self.dispatcher.emit_with_ack(event, data, callback).await
    }

    /// Run queued handlers and ack callbacks; see [`Dispatcher::drain`]
    pub fn drain(&self) -> usize {
        self.dispatcher.drain()
    }

    /// Session id from the engine handshake, if connected
    pub fn sid(&self) -> Option<String> {
        self.dispatcher.sid()
    }

    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn pending_acks(&self) -> usize {
        self.dispatcher.pending_acks()
    }

    pub fn has_handlers(&self, event: &str) -> bool {
        self.dispatcher.has_handlers(event)
    }

    /// The dispatcher behind this client
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

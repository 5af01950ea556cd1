//! Transport abstraction and the WebSocket implementation
//!
//! The dispatcher never touches sockets. It sends text frames through a
//! [`Transport`] and receives lifecycle notifications through a
//! [`TransportListener`]. Listener callbacks run on the transport's reader
//! task and must not block; the dispatcher only queues work in them.
//!
//! The listener usually owns the transport, so [`WsTransport`] keeps only a
//! weak reference to it. The reader task stops once the listener is gone.
//!
//! [`WsTransport`] is the production implementation built on
//! `tokio-tungstenite`. Tests substitute their own `Transport`.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use sockio_core::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Receiver of transport lifecycle notifications
pub trait TransportListener: Send + Sync {
    /// The connection is established
    fn on_open(&self);

    /// A text frame arrived
    fn on_message(&self, text: &str);

    /// The transport hit an error; `info` is a human-readable description
    fn on_error(&self, info: &str);

    /// The connection is gone; `info` is the close reason, possibly empty
    fn on_close(&self, info: &str);
}

/// Text-frame transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection and start delivering frames to `listener`
    ///
    /// Connecting an already connected transport is a no-op.
    async fn connect(&self, listener: Arc<dyn TransportListener>) -> Result<()>;

    /// Send one text frame
    async fn send(&self, text: String) -> Result<()>;

    /// Close the connection; closing a closed transport is a no-op
    async fn close(&self) -> Result<()>;

    fn is_connected(&self) -> bool;
}

/// WebSocket transport over `tokio-tungstenite`
pub struct WsTransport {
    url: String,
    sink: Arc<Mutex<Option<WsSink>>>,
    connected: Arc<AtomicBool>,
    reader: StdMutex<Option<JoinHandle<()>>>,
    listener: StdMutex<Option<Weak<dyn TransportListener>>>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sink: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            reader: StdMutex::new(None),
            listener: StdMutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn receive_loop(
        mut receiver: SplitStream<WsStream>,
        listener: Weak<dyn TransportListener>,
        connected: Arc<AtomicBool>,
    ) {
        let mut reason = String::new();

        while let Some(message) = receiver.next().await {
            let Some(listener) = listener.upgrade() else {
                tracing::debug!("Listener dropped, stopping reader");
                connected.store(false, Ordering::SeqCst);
                return;
            };
            match message {
                Ok(Message::Text(text)) => listener.on_message(&text),
                Ok(Message::Close(frame)) => {
                    tracing::info!("Connection closed by server");
                    if let Some(frame) = frame {
                        reason = frame.reason.to_string();
                    }
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "WebSocket error");
                    reason = e.to_string();
                    listener.on_error(&reason);
                    break;
                }
                _ => {}
            }
        }

        // Whoever flips the flag first reports the close
        if connected.swap(false, Ordering::SeqCst) {
            if let Some(listener) = listener.upgrade() {
                listener.on_close(&reason);
            }
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    #[tracing::instrument(skip(self, listener), fields(url = %self.url))]
    async fn connect(&self, listener: Arc<dyn TransportListener>) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        tracing::info!("Connecting to server");
        let (ws_stream, _) = match connect_async(self.url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                let info = e.to_string();
                listener.on_error(&info);
                return Err(Error::Transport(info));
            }
        };

        let (sender, receiver) = ws_stream.split();
        *self.sink.lock().await = Some(sender);
        self.connected.store(true, Ordering::SeqCst);
        *self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::downgrade(&listener));

        tracing::info!("Connected successfully");
        listener.on_open();

        let handle = tokio::spawn(Self::receive_loop(
            receiver,
            Arc::downgrade(&listener),
            Arc::clone(&self.connected),
        ));
        if let Some(previous) = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }

        Ok(())
    }

    async fn send(&self, text: String) -> Result<()> {
        let mut sink = self.sink.lock().await;
        match sink.as_mut() {
            Some(sender) => sender
                .send(Message::Text(text))
                .await
                .map_err(|e| Error::TransportSend(e.to_string())),
            None => Err(Error::ConnectionClosed),
        }
    }

    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn close(&self) -> Result<()> {
        let sender = self.sink.lock().await.take();
        if let Some(mut sender) = sender {
            if let Err(e) = sender.close().await {
                tracing::debug!(error = %e, "Close handshake failed");
            }
        }

        if let Some(reader) = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            reader.abort();
        }

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .and_then(|listener| listener.upgrade());
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!("Connection closed");
            if let Some(listener) = listener {
                listener.on_close("client closed");
            }
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(reader) = self
            .reader
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            reader.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullListener;

    impl TransportListener for NullListener {
        fn on_open(&self) {}
        fn on_message(&self, _text: &str) {}
        fn on_error(&self, _info: &str) {}
        fn on_close(&self, _info: &str) {}
    }

    #[test]
    fn test_new_is_disconnected() {
        let transport = WsTransport::new("ws://127.0.0.1:1/socket.io/");
        assert!(!transport.is_connected());
        assert_eq!(transport.url(), "ws://127.0.0.1:1/socket.io/");
    }

    #[tokio::test]
    async fn test_send_without_connection() {
        let transport = WsTransport::new("ws://127.0.0.1:1/");
        let result = transport.send("2".to_string()).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 1 is never listening in the test environment
        let transport = WsTransport::new("ws://127.0.0.1:1/");
        let result = transport.connect(Arc::new(NullListener)).await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_close_when_not_connected() {
        let transport = WsTransport::new("ws://127.0.0.1:1/");
        assert!(transport.close().await.is_ok());
        assert!(transport.close().await.is_ok());
    }
}

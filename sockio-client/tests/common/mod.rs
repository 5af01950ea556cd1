//! Common test utilities for sockio-client integration tests
//!
//! - `MockTransport`: an in-memory transport that records sent frames and
//!   lets a test push inbound frames at the client
//! - `MockWsServer`: a WebSocket server speaking just enough of the
//!   handshake to exercise `WsTransport` end to end

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use sockio_client::{ClientBuilder, SocketClient, Transport, TransportListener};
use sockio_core::{Error, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub const MOCK_SID: &str = "mock-sid";

/// Scripted transport
///
/// A successful `connect` delivers the engine handshake (`0{"sid":..}`)
/// and the namespace CONNECT (`40`) to the listener.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<String>>,
    connected: AtomicBool,
    connect_calls: AtomicUsize,
    refuse: AtomicBool,
    connect_delay: Mutex<Duration>,
    listener: Mutex<Option<Arc<dyn TransportListener>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport whose connect attempts fail until `set_refuse(false)`
    pub fn refusing() -> Arc<Self> {
        let transport = Self::new();
        transport.set_refuse(true);
        transport
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    fn listener(&self) -> Arc<dyn TransportListener> {
        self.listener
            .lock()
            .unwrap()
            .clone()
            .expect("transport was never connected")
    }

    /// Push an inbound frame at the client
    pub fn deliver(&self, text: &str) {
        self.listener().on_message(text);
    }

    /// Simulate the server going away
    pub fn drop_connection(&self, reason: &str) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.listener().on_close(reason);
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, listener: Arc<dyn TransportListener>) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.refuse.load(Ordering::SeqCst) {
            listener.on_error("connection refused");
            return Err(Error::Transport("connection refused".to_string()));
        }

        *self.listener.lock().unwrap() = Some(Arc::clone(&listener));
        self.connected.store(true, Ordering::SeqCst);
        listener.on_open();
        listener.on_message(&format!(r#"0{{"sid":"{}","pingInterval":25000}}"#, MOCK_SID));
        listener.on_message("40");
        Ok(())
    }

    async fn send(&self, text: String) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            if let Some(listener) = self.listener.lock().unwrap().clone() {
                listener.on_close("client closed");
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Client wired to `transport` with a short reconnect delay
pub fn client_with(transport: &Arc<MockTransport>, reconnect_delay: Duration) -> SocketClient {
    ClientBuilder::default()
        .transport(transport.clone())
        .reconnect_delay(reconnect_delay)
        .build()
        .unwrap()
}

/// Poll `condition` every 10ms for up to five seconds
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Connect `client` and wait for the handshake to land
pub async fn connect_client(client: &SocketClient) {
    client.connect().unwrap();
    assert!(wait_until(|| client.sid().is_some()).await, "handshake never arrived");
}

type Responder = Arc<dyn Fn(String) -> Option<String> + Send + Sync>;

/// Mock Socket.IO server over a real WebSocket
///
/// Every accepted connection first receives the handshake frames, then each
/// inbound text frame is recorded and passed to the responder.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    message_rx: mpsc::Receiver<String>,
}

impl MockWsServer {
    /// Server that never replies beyond the handshake
    pub async fn new() -> Self {
        Self::with_responder(|_| None).await
    }

    pub async fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(String) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, msg_rx) = mpsc::channel::<String>(100);
        let responder: Responder = Arc::new(responder);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accept_result = listener.accept() => {
                        let Ok((stream, _)) = accept_result else { continue };
                        let msg_tx = msg_tx.clone();
                        let responder = Arc::clone(&responder);

                        tokio::spawn(async move {
                            let Ok(ws_stream) = accept_async(stream).await else { return };
                            let (mut write, mut read) = ws_stream.split();

                            let greeting = [
                                format!(r#"0{{"sid":"{}","pingInterval":25000}}"#, MOCK_SID),
                                "40".to_string(),
                            ];
                            for frame in greeting {
                                if write.send(Message::Text(frame)).await.is_err() {
                                    return;
                                }
                            }

                            while let Some(Ok(message)) = read.next().await {
                                if let Message::Text(text) = message {
                                    let _ = msg_tx.send(text.clone()).await;
                                    if let Some(reply) = responder(text) {
                                        let _ = write.send(Message::Text(reply)).await;
                                    }
                                }
                            }
                        });
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            message_rx: msg_rx,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/socket.io/?EIO=3&transport=websocket", self.addr)
    }

    /// Next frame the server received, or `None` after five seconds
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

//! Inbound classification, outbound emits and the drain queues
//!
//! The dispatcher sits between the transport and the application:
//!
//! - **Inbound**: the transport's reader task calls the [`TransportListener`]
//!   methods. Each frame is decoded, classified, and turned into a queued
//!   [`SocketEvent`] or a resolved acknowledgement. Nothing application-side
//!   runs on the reader task.
//! - **Outbound**: `emit*` builds an EVENT packet with a fresh id, registers
//!   the ack callback if there is one, and sends the frame.
//! - **Drain**: the host calls [`Dispatcher::drain`] from its own loop. Queued
//!   events are fanned out to their handlers and resolved acks are handed to
//!   their callbacks, all on the caller's thread.
//!
//! # Locking
//!
//! Handlers, pending acks, both queues, the packet-id counter and the session
//! id live behind one mutex. Frames are queued under it and `drain` swaps the
//! queues out under it, then releases it before running any user code, so a
//! slow handler never stalls the reader task.
//!
//! # Inbound Classification
//!
//! | Frame | Result |
//! |-------|--------|
//! | OPEN | record `sid` if none yet, queue `"open"` |
//! | CLOSE | queue `"close"` |
//! | MESSAGE / EVENT | parse `[name, arg?]`, queue it |
//! | MESSAGE / ACK | resolve the pending callback by id |
//! | anything else | logged, not dispatched |

use crate::ack::{AckCallback, AckRegistry};
use crate::handlers::{EventHandler, HandlerId, HandlerRegistry};
use crate::metrics::ClientMetrics;
use crate::transport::{Transport, TransportListener};
use serde::Serialize;
use serde_json::Value;
use sockio_core::{
    codec, parse_event, Error, Packet, Result, SocketEvent, SocketPacketKind, TransportPacketKind,
};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An acknowledgement that arrived and waits for `drain`
struct AckResult {
    id: u64,
    payload: Option<Value>,
    callback: AckCallback,
}

struct DispatchState {
    handlers: HandlerRegistry,
    acks: AckRegistry,
    events: VecDeque<SocketEvent>,
    ack_results: VecDeque<AckResult>,
    next_packet_id: u64,
    sid: Option<String>,
}

impl DispatchState {
    fn new() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
            acks: AckRegistry::new(),
            events: VecDeque::new(),
            ack_results: VecDeque::new(),
            next_packet_id: 1,
            sid: None,
        }
    }
}

/// Event dispatcher for one logical connection
pub struct Dispatcher {
    state: Mutex<DispatchState>,
    transport: Arc<dyn Transport>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, metrics: Option<Arc<ClientMetrics>>) -> Self {
        Self {
            state: Mutex::new(DispatchState::new()),
            transport,
            metrics,
        }
    }

    // The state is plain collections, so a panic elsewhere cannot leave it torn
    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler for `event`
    ///
    /// Returns the token to pass to [`off`](Self::off).
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        let event = event.into();
        tracing::debug!(event = %event, "Registering handler");
        self.lock().handlers.register(event, Arc::new(handler))
    }

    /// Remove a handler registration
    ///
    /// Returns `false` and logs when the registration does not exist.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let result = self.lock().handlers.unregister(event, id);
        match result {
            Ok(()) => true,
            Err(e) => {
                self.report(&e);
                false
            }
        }
    }

    pub fn has_handlers(&self, event: &str) -> bool {
        self.lock().handlers.has_handlers(event)
    }

    /// Send `[event]`; returns the packet id used
    pub async fn emit(&self, event: impl Into<String>) -> Result<u64> {
        self.emit_event(SocketEvent::new(event), None).await
    }

    /// Send `[event, data]`
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if `data` cannot be turned into JSON.
    pub async fn emit_with<T: Serialize>(&self, event: impl Into<String>, data: T) -> Result<u64> {
        let argument = serde_json::to_value(data)?;
        self.emit_event(SocketEvent::with_argument(event, argument), None).await
    }

    /// Send `[event]` and call `callback` with the server's acknowledgement
    pub async fn emit_ack<F>(&self, event: impl Into<String>, callback: F) -> Result<u64>
    where
        F: FnOnce(Option<Value>) + Send + 'static,
    {
        self.emit_event(SocketEvent::new(event), Some(Box::new(callback))).await
    }

    /// Send `[event, data]` and call `callback` with the server's acknowledgement
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
        let argument = serde_json::to_value(data)?;
        self.emit_event(
            SocketEvent::with_argument(event, argument),
            Some(Box::new(callback)),
        )
        .await
    }

    async fn emit_event(&self, event: SocketEvent, ack: Option<AckCallback>) -> Result<u64> {
        let expects_ack = ack.is_some();

        // Allocate the id and register the callback before the frame can leave
        let id = {
            let mut state = self.lock();
            let id = state.next_packet_id;
            state.next_packet_id += 1;
            if let Some(callback) = ack {
                state.acks.register(id, callback);
            }
            id
        };

        let frame = codec::encode(&Packet::event(event.to_payload()).with_id(id));
        tracing::debug!(event = %event.name, id, ack = expects_ack, "Emitting event");

        match self.transport.send(frame).await {
            Ok(()) => {
                if let Some(ref m) = self.metrics {
                    m.record_event_emitted(&event.name);
                }
            }
            Err(e) => {
                // The reply can never come, so the callback goes too
                if expects_ack {
                    self.lock().acks.cancel(id);
                }
                self.report(&send_failure(e));
            }
        }

        Ok(id)
    }

    /// Send the graceful disconnect pair: socket DISCONNECT, then engine CLOSE
    ///
    /// Send failures are logged and otherwise ignored.
    pub async fn send_disconnect(&self) {
        let frames = [
            Packet::message(SocketPacketKind::Disconnect),
            Packet::new(TransportPacketKind::Close),
        ];

        for packet in frames {
            if let Err(e) = self.transport.send(codec::encode(&packet)).await {
                self.report(&send_failure(e));
            }
        }
    }

    /// Run queued handlers and ack callbacks on the calling thread
    ///
    /// Returns the number of events plus callbacks processed. Panicking
    /// handlers are caught and logged; the rest of the batch still runs.
    pub fn drain(&self) -> usize {
        let (events, acks) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let events: Vec<(SocketEvent, Vec<EventHandler>)> = std::mem::take(&mut state.events)
                .into_iter()
                .map(|event| {
                    let handlers = state.handlers.handlers_for(&event.name);
                    (event, handlers)
                })
                .collect();
            (events, std::mem::take(&mut state.ack_results))
        };

        let processed = events.len() + acks.len();
        if processed == 0 {
            return 0;
        }

        for (event, handlers) in events {
            if handlers.is_empty() {
                tracing::trace!(event = %event.name, "No handlers for event");
            }
            for handler in handlers {
                if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                    tracing::error!(event = %event.name, "Event handler panicked");
                    if let Some(ref m) = self.metrics {
                        m.record_handler_failure("event");
                    }
                }
            }
        }

        for AckResult {
            id,
            payload,
            callback,
        } in acks
        {
            if catch_unwind(AssertUnwindSafe(move || callback(payload))).is_err() {
                tracing::error!(id, "Acknowledgement callback panicked");
                if let Some(ref m) = self.metrics {
                    m.record_handler_failure("ack");
                }
            }
        }

        if let Some(ref m) = self.metrics {
            m.record_drain(processed as u64);
        }
        processed
    }

    /// Session id from the last engine handshake
    pub fn sid(&self) -> Option<String> {
        self.lock().sid.clone()
    }

    pub fn pending_acks(&self) -> usize {
        self.lock().acks.len()
    }

    /// Events and ack results waiting for the next drain
    pub fn queued(&self) -> usize {
        let state = self.lock();
        state.events.len() + state.ack_results.len()
    }

    fn enqueue(&self, event: SocketEvent) {
        if let Some(ref m) = self.metrics {
            m.record_event_received(&event.name);
        }
        self.lock().events.push_back(event);
    }

    fn report(&self, error: &Error) {
        tracing::warn!(error = %error, kind = error.kind(), "Dropped by dispatcher");
        if let Some(ref m) = self.metrics {
            m.record_anomaly(error.kind());
        }
    }

    fn handle_frame(&self, text: &str) {
        let packet = match codec::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                self.report(&e);
                return;
            }
        };

        match packet.transport_kind() {
            TransportPacketKind::Open => self.handle_open(&packet),
            TransportPacketKind::Close => self.enqueue(SocketEvent::new("close")),
            TransportPacketKind::Message => self.handle_message(packet),
            other => tracing::debug!(kind = ?other, "Transport packet not dispatched"),
        }
    }

    fn handle_open(&self, packet: &Packet) {
        let mut state = self.lock();
        if state.sid.is_none() {
            match packet
                .payload()
                .and_then(|payload| payload.get("sid"))
                .and_then(Value::as_str)
            {
                Some(sid) => {
                    tracing::info!(sid, "Session opened");
                    state.sid = Some(sid.to_string());
                }
                None => tracing::warn!("OPEN packet without a session id"),
            }
        }
        state.events.push_back(SocketEvent::new("open"));
    }

    fn handle_message(&self, packet: Packet) {
        match packet.socket_kind() {
            Some(SocketPacketKind::Event) => {
                let Some(payload) = packet.payload() else {
                    tracing::debug!("EVENT packet without payload");
                    return;
                };
                match parse_event(payload) {
                    Ok(event) => self.enqueue(event),
                    Err(e) => self.report(&e),
                }
            }
            Some(SocketPacketKind::Ack) => {
                let Some(id) = packet.id() else {
                    tracing::debug!("ACK packet without id");
                    return;
                };

                let mut state = self.lock();
                match state.acks.complete(id) {
                    Ok(callback) => {
                        tracing::debug!(id, "Acknowledgement received");
                        state.ack_results.push_back(AckResult {
                            id,
                            payload: packet.into_payload(),
                            callback,
                        });
                        drop(state);
                        if let Some(ref m) = self.metrics {
                            m.record_ack_resolved();
                        }
                    }
                    Err(e) => {
                        drop(state);
                        self.report(&e);
                    }
                }
            }
            Some(SocketPacketKind::Error) => tracing::warn!(
                namespace = %packet.namespace(),
                payload = ?packet.payload(),
                "Server reported an error"
            ),
            other => tracing::debug!(
                kind = ?other,
                namespace = %packet.namespace(),
                "Socket packet not dispatched"
            ),
        }
    }
}

fn send_failure(error: Error) -> Error {
    match error {
        Error::TransportSend(_) => error,
        other => Error::TransportSend(other.to_string()),
    }
}

impl TransportListener for Dispatcher {
    fn on_open(&self) {
        tracing::info!("Transport opened");
    }

    fn on_message(&self, text: &str) {
        self.handle_frame(text);
    }

    fn on_error(&self, info: &str) {
        tracing::warn!(error = %info, "Transport error");
        self.enqueue(SocketEvent::with_argument("error", Value::String(info.to_string())));
    }

    fn on_close(&self, info: &str) {
        tracing::info!(reason = %info, "Transport closed");
        let mut state = self.lock();
        state.sid = None;
        state
            .events
            .push_back(SocketEvent::with_argument("close", Value::String(info.to_string())));
    }
}

//! Acknowledgement tracking for emitted events
//!
//! An emit may ask the server to acknowledge it. The emit's packet id is
//! registered here together with a callback; when an ACK packet with the same
//! id arrives, the callback is taken out of the registry and handed to the
//! dispatcher's ack queue, to be invoked on the next `drain()`.
//!
//! # Entry Lifecycle
//!
//! 1. **Register**: the emit allocates an id and registers the callback
//!    before the frame is sent
//! 2. **Complete**: the matching ACK removes the entry, exactly once
//! 3. **Unknown**: an ACK for an id that is not (or no longer) pending is
//!    reported as `Error::UnknownAcknowledgement` and never inserted
//!
//! Entries never expire. A callback whose ACK never arrives stays pending
//! until the client is dropped.
//!
//! The registry is not synchronised on its own; the dispatcher keeps it
//! behind the same lock as its queues.

use serde_json::Value;
use sockio_core::{Error, Result};
use std::collections::HashMap;

/// Callback invoked with the ACK packet's payload
pub type AckCallback = Box<dyn FnOnce(Option<Value>) + Send + 'static>;

/// Pending acknowledgements keyed by packet id
#[derive(Default)]
pub struct AckRegistry {
    pending: HashMap<u64, AckCallback>,
}

impl AckRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an outgoing packet id
    ///
    /// Ids come from a monotonic counter, so a live entry is never replaced.
    pub fn register(&mut self, id: u64, callback: AckCallback) {
        if self.pending.insert(id, callback).is_some() {
            tracing::warn!(id, "Replaced pending acknowledgement with the same id");
        }
    }

    /// Take the callback for an incoming ACK
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownAcknowledgement` if no callback is pending for `id`.
    pub fn complete(&mut self, id: u64) -> Result<AckCallback> {
        self.pending
            .remove(&id)
            .ok_or(Error::UnknownAcknowledgement(id))
    }

    /// Drop a pending entry without invoking it
    pub fn cancel(&mut self, id: u64) -> bool {
        self.pending.remove(&id).is_some()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of acknowledgements still waiting for a reply
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

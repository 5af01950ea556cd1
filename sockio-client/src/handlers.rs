//! Event handler registry
//!
//! Maps event names to an ordered list of handlers. Handlers for the same
//! name run in registration order, and registering the same closure twice
//! gives two entries.
//!
//! Closures cannot be compared, so `on` hands back a [`HandlerId`] and `off`
//! takes it. Removing the last handler of a name removes the name entirely.
//!
//! # Examples
//!
//! ```rust
//! use sockio_client::HandlerRegistry;
//! use sockio_core::SocketEvent;
//! use std::sync::Arc;
//!
//! let mut registry = HandlerRegistry::new();
//! let id = registry.register("chat", Arc::new(|event: &SocketEvent| println!("{:?}", event)));
//! assert!(registry.has_handlers("chat"));
//!
//! registry.unregister("chat", id).unwrap();
//! assert!(!registry.has_handlers("chat"));
//! ```

use sockio_core::{Error, Result, SocketEvent};
use std::collections::HashMap;
use std::sync::Arc;

/// Handler invoked for every drained event with a matching name
pub type EventHandler = Arc<dyn Fn(&SocketEvent) + Send + Sync>;

/// Token identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Handlers keyed by event name
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<(HandlerId, EventHandler)>>,
    next_id: u64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `event` and return its token
    pub fn register(&mut self, event: impl Into<String>, handler: EventHandler) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers
            .entry(event.into())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove the registration identified by `id` from `event`
    ///
    /// # Errors
    ///
    /// Returns `Error::UnregisteredHandler` when the name has no handlers or
    /// the token does not belong to it.
    pub fn unregister(&mut self, event: &str, id: HandlerId) -> Result<()> {
        let unregistered = || Error::UnregisteredHandler {
            event: event.to_string(),
        };

        let list = self.handlers.get_mut(event).ok_or_else(unregistered)?;
        let position = list
            .iter()
            .position(|(handler_id, _)| *handler_id == id)
            .ok_or_else(unregistered)?;

        list.remove(position);
        if list.is_empty() {
            self.handlers.remove(event);
        }
        Ok(())
    }

    /// Snapshot of the handlers for `event`, in registration order
    pub fn handlers_for(&self, event: &str) -> Vec<EventHandler> {
        self.handlers
            .get(event)
            .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default()
    }

    pub fn has_handlers(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// All event names with at least one handler
    pub fn events(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> EventHandler {
        let log = Arc::clone(log);
        Arc::new(move |_: &SocketEvent| log.lock().unwrap().push(tag))
    }

    #[test]
    fn test_registration_order_preserved() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.register("tick", recorder(&log, "first"));
        registry.register("tick", recorder(&log, "second"));

        let event = SocketEvent::new("tick");
        for handler in registry.handlers_for("tick") {
            handler(&event);
        }
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_duplicates_allowed() {
        let mut registry = HandlerRegistry::new();
        let handler: EventHandler = Arc::new(|_: &SocketEvent| {});
        let a = registry.register("dup", Arc::clone(&handler));
        let b = registry.register("dup", handler);
        assert_ne!(a, b);
        assert_eq!(registry.handlers_for("dup").len(), 2);
    }

    #[test]
    fn test_unregister_removes_only_that_registration() {
        let mut registry = HandlerRegistry::new();
        let a = registry.register("evt", Arc::new(|_: &SocketEvent| {}));
        let _b = registry.register("evt", Arc::new(|_: &SocketEvent| {}));

        registry.unregister("evt", a).unwrap();
        assert_eq!(registry.handlers_for("evt").len(), 1);
        assert!(registry.has_handlers("evt"));
    }

    #[test]
    fn test_unregister_last_removes_name() {
        let mut registry = HandlerRegistry::new();
        let id = registry.register("evt", Arc::new(|_: &SocketEvent| {}));
        registry.unregister("evt", id).unwrap();
        assert!(!registry.has_handlers("evt"));
        assert!(registry.events().is_empty());
    }

    #[test]
    fn test_unregister_unknown() {
        let mut registry = HandlerRegistry::new();
        let id = registry.register("known", Arc::new(|_: &SocketEvent| {}));

        assert!(matches!(
            registry.unregister("missing", id),
            Err(Error::UnregisteredHandler { .. })
        ));

        registry.unregister("known", id).unwrap();
        assert!(matches!(
            registry.unregister("known", id),
            Err(Error::UnregisteredHandler { .. })
        ));
    }

    #[test]
    fn test_handlers_for_missing_event() {
        let registry = HandlerRegistry::new();
        assert!(registry.handlers_for("nothing").is_empty());
    }
}

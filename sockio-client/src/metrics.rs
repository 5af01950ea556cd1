//! Client metrics definitions
//!
//! OpenTelemetry instruments for the client runtime. They are created when
//! observability is enabled through `ClientBuilder::with_observability()` and
//! exported by whatever meter provider the host installed.
//!
//! # Metrics Collected
//!
//! - **connection_state**: current supervisor state (gauge)
//! - **events_emitted**: EVENT frames handed to the transport (counter)
//! - **events_received**: inbound events queued for dispatch (counter)
//! - **acks_resolved**: acknowledgements matched to a pending emit (counter)
//! - **anomalies**: protocol anomalies, labelled by error kind (counter)
//! - **handler_failures**: handlers or ack callbacks that panicked (counter)
//! - **reconnection_attempts** / **reconnection_success**: supervisor activity
//! - **drained_items**: items processed per `drain()` call (histogram)
//!
//! # Examples
//!
//! ```rust,no_run
//! use sockio_client::ClientMetrics;
//!
//! let metrics = ClientMetrics::new("game-client");
//! metrics.record_event_emitted("chat");
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram, Meter},
    KeyValue,
};

/// Client metrics for monitoring
pub struct ClientMetrics {
    /// Connection state (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed)
    pub connection_state: Gauge<i64>,
    pub events_emitted: Counter<u64>,
    pub events_received: Counter<u64>,
    pub acks_resolved: Counter<u64>,
    /// Protocol anomalies by `Error::kind()`
    pub anomalies: Counter<u64>,
    pub handler_failures: Counter<u64>,
    pub reconnection_attempts: Counter<u64>,
    pub reconnection_success: Counter<u64>,
    /// Number of events plus ack callbacks processed by one drain
    pub drained_items: Histogram<u64>,
}

impl ClientMetrics {
    /// Create metrics on the global meter named after the service
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a caller-supplied meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("sockio.client.connection.state")
                .with_description("Connection state (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed)")
                .build(),
            events_emitted: meter
                .u64_counter("sockio.client.events.emitted")
                .with_description("Total number of events sent to the server")
                .build(),
            events_received: meter
                .u64_counter("sockio.client.events.received")
                .with_description("Total number of events queued for dispatch")
                .build(),
            acks_resolved: meter
                .u64_counter("sockio.client.acks.resolved")
                .with_description("Total number of acknowledgements matched to an emit")
                .build(),
            anomalies: meter
                .u64_counter("sockio.client.anomalies")
                .with_description("Protocol anomalies reported and dropped")
                .build(),
            handler_failures: meter
                .u64_counter("sockio.client.handler.failures")
                .with_description("Handlers and ack callbacks that panicked during drain")
                .build(),
            reconnection_attempts: meter
                .u64_counter("sockio.client.reconnection.attempts")
                .with_description("Total number of connection attempts made by the supervisor")
                .build(),
            reconnection_success: meter
                .u64_counter("sockio.client.reconnection.success")
                .with_description("Total number of successful reconnections")
                .build(),
            drained_items: meter
                .u64_histogram("sockio.client.drain.items")
                .with_description("Items processed per drain call")
                .build(),
        }
    }

    pub fn update_connection_state(&self, state: i64) {
        self.connection_state.record(state, &[]);
    }

    pub fn record_event_emitted(&self, event: &str) {
        self.events_emitted
            .add(1, &[KeyValue::new("event", event.to_string())]);
    }

    pub fn record_event_received(&self, event: &str) {
        self.events_received
            .add(1, &[KeyValue::new("event", event.to_string())]);
    }

    pub fn record_ack_resolved(&self) {
        self.acks_resolved.add(1, &[]);
    }

    /// Record a dropped frame or failed send, labelled by error kind
    pub fn record_anomaly(&self, kind: &str) {
        self.anomalies
            .add(1, &[KeyValue::new("kind", kind.to_string())]);
    }

    pub fn record_handler_failure(&self, target: &str) {
        self.handler_failures
            .add(1, &[KeyValue::new("target", target.to_string())]);
    }

    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }

    pub fn record_drain(&self, items: u64) {
        self.drained_items.record(items, &[]);
    }
}

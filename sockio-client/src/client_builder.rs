//! Client configuration
//!
//! `ClientBuilder` collects the plain configuration values before a
//! [`SocketClient`] is created:
//! - the server URL
//! - whether to connect immediately
//! - the reconnect delay, or a custom retry strategy
//! - an alternative transport (tests use this)
//! - observability (OpenTelemetry)
//!
//! # Examples
//!
//! ```rust,no_run
//! use sockio_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> sockio_core::Result<()> {
//! let client = ClientBuilder::new("ws://localhost:4567/socket.io/?EIO=3&transport=websocket")
//!     .reconnect_delay(Duration::from_secs(2))
//!     .auto_connect(true)
//!     .build()?;
//!
//! let traced = ClientBuilder::default()
//!     .with_exponential_backoff()
//!     .with_default_observability()
//!     .service_name("game-client")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::dispatcher::Dispatcher;
use crate::reconnect::{ExponentialBackoff, FixedDelay, ReconnectionStrategy};
use crate::supervisor::ConnectionSupervisor;
use crate::transport::{Transport, TransportListener, WsTransport};
use crate::{ClientMetrics, SocketClient};
use sockio_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Server address used when none is given
pub const DEFAULT_URL: &str = "ws://127.0.0.1:4567/socket.io/?EIO=3&transport=websocket";

/// Delay between connection checks and between retries
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Builder for configuring and creating a [`SocketClient`]
pub struct ClientBuilder {
    url: String,
    auto_connect: bool,
    reconnect_delay: Duration,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    transport: Option<Arc<dyn Transport>>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

impl ClientBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auto_connect: false,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            reconnect_strategy: None,
            transport: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Start the supervisor as part of `build()`
    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    /// Poll interval while connected, and the retry delay unless a strategy is set
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Pace retries with a custom strategy
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self
    }

    /// Pace retries with [`ExponentialBackoff::default`]
    pub fn with_exponential_backoff(mut self) -> Self {
        self.reconnect_strategy = Some(Box::new(ExponentialBackoff::default()));
        self
    }

    /// Use `transport` instead of a WebSocket to `url`
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Create the client, connecting it if `auto_connect` is set
    ///
    /// # Errors
    ///
    /// Fails when observability cannot be initialised, or when
    /// `auto_connect` is set and there is no tokio runtime.
    pub fn build(self) -> Result<SocketClient> {
        let metrics = match self.observability_config {
            Some(mut config) => {
                if let Some(name) = self.service_name {
                    config.service_name = name;
                }

                sockio_core::init_observability(config.clone()).map_err(|e| {
                    Error::Internal(format!("Failed to initialize observability: {}", e))
                })?;

                Some(Arc::new(ClientMetrics::new(config.service_name)))
            }
            None => None,
        };

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WsTransport::new(self.url.clone())));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&transport), metrics.clone()));

        let reconnect_delay = self.reconnect_delay;
        let strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(FixedDelay::new(reconnect_delay)));
        let listener: Arc<dyn TransportListener> = dispatcher.clone();
        let supervisor = ConnectionSupervisor::new(
            Arc::clone(&transport),
            listener,
            strategy,
            reconnect_delay,
            metrics,
        );

        let client = SocketClient {
            url: self.url,
            transport,
            dispatcher,
            supervisor,
        };

        if self.auto_connect {
            client.connect()?;
        }

        Ok(client)
    }
}

//! Connection supervision
//!
//! A background task that keeps the transport connected while the client
//! wants it to be. It never touches the dispatcher's queues; it only looks at
//! the connect intent and the transport's own connectivity.
//!
//! # Connection States
//!
//! - **Disconnected**: supervisor not running
//! - **Connecting**: first attempt in progress
//! - **Connected**: transport reports itself connected
//! - **Reconnecting**: previous attempts failed, retrying
//! - **Failed**: the reconnection strategy gave up
//!
//! ```text
//! Disconnected → Connecting → Connected
//!                     ↓          ↓
//!                  Failed ← Reconnecting
//! ```
//!
//! # Loop
//!
//! While the intent flag is set:
//! 1. Transport connected: wait one poll interval
//! 2. Otherwise call `connect`; on failure ask the strategy for the delay
//!    before the next attempt, or enter `Failed` if it gives up
//!
//! Every wait and every in-flight `connect` races a shutdown signal, so
//! [`ConnectionSupervisor::stop`] returns without waiting out a delay.

use crate::metrics::ClientMetrics;
use crate::reconnect::ReconnectionStrategy;
use crate::transport::{Transport, TransportListener};
use sockio_core::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Retrying after `attempt` failed attempts
    Reconnecting { attempt: u32 },
    /// The reconnection strategy gave up
    Failed,
}

impl ConnectionState {
    /// Numeric code used by the connection state gauge
    pub fn code(&self) -> i64 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting { .. } => 3,
            ConnectionState::Failed => 4,
        }
    }
}

struct Shared {
    transport: Arc<dyn Transport>,
    listener: Arc<dyn TransportListener>,
    strategy: Mutex<Box<dyn ReconnectionStrategy>>,
    state: RwLock<ConnectionState>,
    intent: AtomicBool,
    poll_interval: Duration,
    metrics: Option<Arc<ClientMetrics>>,
}

impl Shared {
    fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state != new_state {
            tracing::debug!(from = ?*state, to = ?new_state, "Connection state changed");
            if let Some(ref m) = self.metrics {
                m.update_connection_state(new_state.code());
            }
            *state = new_state;
        }
    }

    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        self.strategy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_delay(attempt)
    }

    fn reset_strategy(&self) {
        self.strategy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the reconnect loop task
pub struct ConnectionSupervisor {
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl ConnectionSupervisor {
    /// Create a stopped supervisor
    ///
    /// `poll_interval` is how often a healthy connection is re-checked.
    pub fn new(
        transport: Arc<dyn Transport>,
        listener: Arc<dyn TransportListener>,
        strategy: Box<dyn ReconnectionStrategy>,
        poll_interval: Duration,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                listener,
                strategy: Mutex::new(strategy),
                state: RwLock::new(ConnectionState::Disconnected),
                intent: AtomicBool::new(false),
                poll_interval,
                metrics,
            }),
            running: Mutex::new(None),
        }
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the connect intent and spawn the loop
    ///
    /// Starting a running supervisor is a no-op. A supervisor that ended in
    /// `Failed` can be started again.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` when called outside a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("connect requires a tokio runtime: {}", e)))?;

        let mut running = self.lock_running();
        if running
            .as_ref()
            .is_some_and(|r| !r.task.is_finished() && self.is_active())
        {
            tracing::debug!("Supervisor already running");
            return Ok(());
        }
        // A loop that gave up may still be unwinding
        if let Some(previous) = running.take() {
            previous.task.abort();
        }

        self.shared.intent.store(true, Ordering::SeqCst);
        self.shared.reset_strategy();
        let (shutdown, receiver) = watch::channel(false);
        let task = runtime.spawn(supervise(Arc::clone(&self.shared), receiver));
        *running = Some(Running { shutdown, task });

        tracing::info!("Supervisor started");
        Ok(())
    }

    /// Clear the intent, interrupt the loop and wait for it to finish
    ///
    /// Safe to call repeatedly and on a supervisor that never started.
    pub async fn stop(&self) {
        self.shared.intent.store(false, Ordering::SeqCst);

        let running = self.lock_running().take();
        if let Some(Running { shutdown, task }) = running {
            // The loop may already have exited on its own
            let _ = shutdown.send(true);
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "Supervisor task panicked");
                }
            }
            tracing::info!("Supervisor stopped");
        }

        self.shared.set_state(ConnectionState::Disconnected);
    }

    pub fn state(&self) -> ConnectionState {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the client currently wants to be connected
    pub fn is_active(&self) -> bool {
        self.shared.intent.load(Ordering::SeqCst)
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.shared.intent.store(false, Ordering::SeqCst);
        if let Some(running) = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = running.shutdown.send(true);
            running.task.abort();
        }
    }
}

async fn supervise(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut attempt: u32 = 0;

    while shared.intent.load(Ordering::SeqCst) {
        let delay = if shared.transport.is_connected() {
            shared.set_state(ConnectionState::Connected);
            shared.poll_interval
        } else {
            shared.set_state(if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt }
            });
            if let Some(ref m) = shared.metrics {
                m.record_reconnection_attempt();
            }

            let result = tokio::select! {
                _ = shutdown.changed() => break,
                result = shared.transport.connect(Arc::clone(&shared.listener)) => result,
            };

            match result {
                Ok(()) => {
                    tracing::info!(attempt, "Transport connected");
                    if attempt > 0 {
                        if let Some(ref m) = shared.metrics {
                            m.record_reconnection_success();
                        }
                    }
                    shared.reset_strategy();
                    attempt = 0;
                    shared.set_state(ConnectionState::Connected);
                    shared.poll_interval
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "Connection attempt failed");
                    let next = shared.next_delay(attempt);
                    attempt = attempt.saturating_add(1);
                    match next {
                        Some(delay) => delay,
                        None => {
                            tracing::error!(attempts = attempt, "Reconnection abandoned");
                            shared.intent.store(false, Ordering::SeqCst);
                            shared.set_state(ConnectionState::Failed);
                            return;
                        }
                    }
                }
            }
        };

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("Supervisor loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::FixedDelay;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct NullListener;

    impl TransportListener for NullListener {
        fn on_open(&self) {}
        fn on_message(&self, _text: &str) {}
        fn on_error(&self, _info: &str) {}
        fn on_close(&self, _info: &str) {}
    }

    /// Fails the first `failures` connects, then succeeds
    struct FlakyTransport {
        failures: usize,
        connect_delay: Duration,
        calls: AtomicUsize,
        connected: AtomicBool,
    }

    impl FlakyTransport {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                connect_delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                connected: AtomicBool::new(false),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn connect(&self, _listener: Arc<dyn TransportListener>) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.connect_delay).await;
            if call < self.failures {
                return Err(Error::Transport("refused".to_string()));
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, _text: String) -> Result<()> {
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    fn supervisor(
        transport: Arc<FlakyTransport>,
        strategy: Box<dyn ReconnectionStrategy>,
    ) -> ConnectionSupervisor {
        ConnectionSupervisor::new(
            transport,
            Arc::new(NullListener),
            strategy,
            Duration::from_millis(20),
            None,
        )
    }

    async fn wait_for_state(supervisor: &ConnectionSupervisor, expected: ConnectionState) {
        for _ in 0..200 {
            if supervisor.state() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("state never became {:?}, is {:?}", expected, supervisor.state());
    }

    #[test]
    fn test_start_requires_runtime() {
        let transport = Arc::new(FlakyTransport::new(0));
        let supervisor = supervisor(
            transport,
            Box::new(FixedDelay::new(Duration::from_millis(10))),
        );
        assert!(matches!(supervisor.start(), Err(Error::Internal(_))));
        assert!(!supervisor.is_active());
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(ConnectionState::Disconnected.code(), 0);
        assert_eq!(ConnectionState::Connecting.code(), 1);
        assert_eq!(ConnectionState::Connected.code(), 2);
        assert_eq!(ConnectionState::Reconnecting { attempt: 3 }.code(), 3);
        assert_eq!(ConnectionState::Failed.code(), 4);
    }

    #[tokio::test]
    async fn test_retries_until_connected() {
        let transport = Arc::new(FlakyTransport::new(2));
        let supervisor = supervisor(
            transport.clone(),
            Box::new(FixedDelay::new(Duration::from_millis(10))),
        );

        supervisor.start().unwrap();
        wait_for_state(&supervisor, ConnectionState::Connected).await;
        assert_eq!(transport.calls(), 3);

        supervisor.stop().await;
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
        assert!(!supervisor.is_active());
    }

    #[tokio::test]
    async fn test_reconnects_after_drop() {
        let transport = Arc::new(FlakyTransport::new(0));
        let supervisor = supervisor(
            transport.clone(),
            Box::new(FixedDelay::new(Duration::from_millis(10))),
        );

        supervisor.start().unwrap();
        wait_for_state(&supervisor, ConnectionState::Connected).await;

        transport.connected.store(false, Ordering::SeqCst);
        for _ in 0..200 {
            if transport.calls() >= 2 && transport.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(transport.calls(), 2);
        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_strategy_gives_up() {
        let transport = Arc::new(FlakyTransport::new(usize::MAX));
        let supervisor = supervisor(
            transport.clone(),
            Box::new(FixedDelay::new(Duration::from_millis(5)).with_max_attempts(2)),
        );

        supervisor.start().unwrap();
        wait_for_state(&supervisor, ConnectionState::Failed).await;
        assert_eq!(transport.calls(), 3);
        assert!(!supervisor.is_active());

        supervisor.stop().await;
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_stop_interrupts_in_flight_connect() {
        let transport = Arc::new(FlakyTransport {
            connect_delay: Duration::from_secs(30),
            ..FlakyTransport::new(0)
        });
        let supervisor = supervisor(
            transport.clone(),
            Box::new(FixedDelay::new(Duration::from_secs(30))),
        );

        supervisor.start().unwrap();
        while transport.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::timeout(Duration::from_secs(1), supervisor.stop())
            .await
            .expect("stop should not wait for the connect to finish");
        assert_eq!(transport.calls(), 1);
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let transport = Arc::new(FlakyTransport::new(0));
        let supervisor = supervisor(
            transport.clone(),
            Box::new(FixedDelay::new(Duration::from_millis(10))),
        );

        supervisor.start().unwrap();
        supervisor.start().unwrap();
        wait_for_state(&supervisor, ConnectionState::Connected).await;
        assert_eq!(transport.calls(), 1);

        supervisor.stop().await;
        supervisor.stop().await;
    }
}

//! Retry pacing for the connection supervisor
//!
//! While the client wants to be connected, the supervisor keeps calling the
//! transport's `connect`. After every failed attempt it asks a
//! [`ReconnectionStrategy`] how long to wait before the next one, or whether
//! to stop trying.
//!
//! # Built-in Strategies
//!
//! - **FixedDelay**: the same delay before every retry (the client default,
//!   using the configured reconnect delay)
//! - **ExponentialBackoff**: doubling delays with an upper bound and
//!   optional jitter
//!
//! # Examples
//!
//! ```rust
//! use sockio_client::{ExponentialBackoff, FixedDelay, ReconnectionStrategy};
//! use std::time::Duration;
//!
//! let mut fixed = FixedDelay::new(Duration::from_secs(5));
//! assert_eq!(fixed.next_delay(7), Some(Duration::from_secs(5)));
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_millis(250), Duration::from_secs(30))
//!     .with_max_attempts(20);
//! assert_eq!(backoff.next_delay(2), Some(Duration::from_secs(1)));
//! ```

use std::time::Duration;

/// Decides the wait between connection attempts
///
/// `attempt` counts failed attempts since the last successful connection,
/// starting at 0. `reset()` is called once a connection is established.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before the next attempt, or `None` to give up
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;

    /// Forget accumulated state after a successful connection
    fn reset(&mut self);
}

/// Doubling delay between `min_delay` and `max_delay`
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    jitter: bool,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            max_attempts: None,
            jitter: false,
            current_attempt: 0,
        }
    }

    /// Give up after this many failed attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Add up to 25% random extra delay
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Last attempt number seen by `next_delay`
    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30)).with_jitter()
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        self.current_attempt = attempt;

        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        let base = (self.min_delay.as_millis() as u64).saturating_mul(2u64.saturating_pow(attempt));
        let delay = base.min(self.max_delay.as_millis() as u64);

        if self.jitter {
            use rand::Rng;
            let jitter_ms = rand::thread_rng().gen_range(0..=(delay / 4));
            return Some(Duration::from_millis(delay + jitter_ms));
        }

        Some(Duration::from_millis(delay))
    }

    fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

/// Constant delay between attempts
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after this many failed attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(self.delay),
        }
    }

    fn reset(&mut self) {}
}

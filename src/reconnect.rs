//! Reconnect scheduling: exponential backoff and the retry timer.
//!
//! The delay starts at the base value, doubles after every scheduled retry
//! up to the maximum, and returns to the base after a successful
//! authentication. At most one retry timer is armed at a time.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound for the reconnect delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Configuration for reconnect backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay of the first retry after a successful session (or at startup).
    pub base_delay: Duration,
    /// Cap for the doubling delay.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

/// Exponential backoff state.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub(crate) fn new(config: &ReconnectConfig) -> Self {
        Self {
            base: config.base_delay,
            max: config.max_delay,
            current: config.base_delay,
        }
    }

    /// Delay for the next retry; doubles the delay used after it.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current.min(self.max);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Return to the base delay.
    pub(crate) fn reset(&mut self) {
        self.current = self.base;
    }
}

/// Owned handle to the single scheduled reconnect.
///
/// Each arm gets a new epoch. A firing timer only counts if its epoch is
/// still the armed one, so a timer cancelled while already waking up cannot
/// trigger a stale connect.
#[derive(Debug, Default)]
pub(crate) struct RetryTimer {
    handle: Option<JoinHandle<()>>,
    epoch: u64,
}

impl RetryTimer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether a retry is scheduled and has not fired yet.
    pub(crate) fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Schedule `fire(epoch)` after `delay`, replacing any armed timer.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn arm<F>(&mut self, delay: Duration, fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        self.epoch += 1;
        let epoch = self.epoch;

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire(epoch);
        }));

        epoch
    }

    /// Disarm on firing. Returns `false` if `epoch` was cancelled or replaced.
    pub(crate) fn take_fired(&mut self, epoch: u64) -> bool {
        if self.handle.is_some() && self.epoch == epoch {
            self.handle = None;
            true
        } else {
            false
        }
    }

    /// Cancel the armed timer, if any.
    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

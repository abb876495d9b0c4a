// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Burst debounce timer.
//!
//! Storage changes rarely come alone: saving one desktop file may produce a
//! create, several modify, and a rename event within a few milliseconds. A
//! [`Debouncer`] coalesces such a __burst__ into a single call of its action,
//! fired once no new event arrived for the configured delay.
//!
//! Timers run as one-shot Tokio tasks. Touching or cancelling a debouncer
//! therefore requires a running Tokio runtime.

use std::{fmt, sync::Arc, time::Duration};
use tokio::task::AbortHandle;

/// Delay used when none is configured.
pub const DEFAULT_BURST_DELAY: Duration = Duration::from_millis(100);

/// Coalesce bursts of events into one delayed action.
///
/// # Invariants
///
/// - At most one timer is pending at any time.
/// - Dropping the debouncer cancels the pending timer.
pub struct Debouncer {
    delay: Duration,
    action: Arc<dyn Fn() + Send + Sync>,
    pending: Option<AbortHandle>,
}

impl Debouncer {
    /// Construct idle debouncer.
    pub fn new(delay: Duration, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            delay,
            action: Arc::new(action),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an event, restarting the delay.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn touch(&mut self) {
        self.cancel();

        let action = Arc::clone(&self.action);
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        self.pending = Some(task.abort_handle());
    }

    /// Drop pending timer without firing.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

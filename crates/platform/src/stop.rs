//! Cooperative cancellation.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const RUNNING: u8 = 0;
/// Stop requested, not yet seen by any bounded wait.
const PENDING: u8 = 1;
/// Stop requested and already acted on.
const DRAINING: u8 = 2;

/// Process-wide stop request, shared between the control loop, serving
/// threads and signal handlers.
///
/// A request interrupts at most one [`BoundedWait`](crate::BoundedWait):
/// the first wait that notices it takes the interrupt, every later wait
/// runs to its own bound so the shutdown that follows can still blank the
/// panel and release resources.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicU8>);

impl StopFlag {
    /// A flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Async-signal-safe.
    pub fn set(&self) {
        // A second request must not re-arm the interrupt during shutdown.
        let _ = self
            .0
            .compare_exchange(RUNNING, PENDING, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst) != RUNNING
    }

    /// Take the pending interrupt. Returns `true` once per request.
    pub fn take_interrupt(&self) -> bool {
        self.0
            .compare_exchange(PENDING, DRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Mark the request as handled so no later wait is interrupted.
    pub fn drain(&self) {
        if self.is_set() {
            self.0.store(DRAINING, Ordering::SeqCst);
        }
    }
}

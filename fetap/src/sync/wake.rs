//! Binary wake signal shared between interrupt, timer and task contexts.
//!
//! A `WakeSignal` behaves like a binary semaphore: any number of `give()`
//! calls before the consumer runs collapse into a single pending wake.
//!
//! # Contract
//!
//! - `give()` may be called from any context, including interrupt handlers.
//! - Only ONE context may consume (`try_take()` / `take()`).

use core::sync::atomic::{AtomicBool, Ordering};

/// A single-slot, non-counting wake signal.
pub struct WakeSignal {
    pending: AtomicBool,
}

impl WakeSignal {
    /// Create a signal with no wake pending.
    pub const fn new() -> Self {
        WakeSignal {
            pending: AtomicBool::new(false),
        }
    }

    /// Post a wake. Never blocks.
    #[inline]
    pub fn give(&self) {
        // Release pairs with the Acquire in try_take(): writes made by the
        // giver before this call are visible to the woken consumer.
        self.pending.store(true, Ordering::Release);
    }

    /// Consume a pending wake, if any.
    #[inline]
    pub fn try_take(&self) -> bool {
        self.pending.swap(false, Ordering::Acquire)
    }

    /// Block until a wake is available and consume it.
    ///
    /// `idle` runs between polls (e.g. `wfi`).
    pub fn take(&self, mut idle: impl FnMut()) {
        while !self.try_take() {
            idle();
        }
    }

    /// Whether a wake is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

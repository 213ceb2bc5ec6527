//! Rising-edge latch for the dial line.
//!
//! [`EdgeDetector`] is the body of the GPIO interrupt handler. It only has to
//! notice the *first* rising edge of a pulse train: every later edge in the
//! same train finds the session anchor already open and is ignored.
//!
//! ## Usage with RTIC
//!
//! ```ignore
//! static DIAL: DialShared = DialShared::new();
//!
//! #[task(binds = GPIO4_COMBINED_0_15, local = [dial_input])]
//! fn dial_edge(cx: dial_edge::Context) {
//!     cx.local.dial_input.clear_triggered();
//!     EdgeDetector::new(&DIAL).on_rising_edge(ticks_now());
//! }
//! ```

use crate::clock::Ticks;

use super::DialShared;

/// Interrupt-context half of the dial decoder.
///
/// Only touches atomics: no logging, no allocation, no blocking.
#[derive(Clone, Copy)]
pub struct EdgeDetector<'a> {
    shared: &'a DialShared,
}

impl<'a> EdgeDetector<'a> {
    pub const fn new(shared: &'a DialShared) -> Self {
        EdgeDetector { shared }
    }

    /// Handle a rising edge observed at tick `now`.
    ///
    /// Returns `true` if this edge started a new session and woke the
    /// sampler.
    #[inline]
    pub fn on_rising_edge(&self, now: Ticks) -> bool {
        if self.shared.anchor.try_open(now) {
            self.shared.wake.give();
            true
        } else {
            false
        }
    }
}

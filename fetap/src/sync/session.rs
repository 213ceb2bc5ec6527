//! Session anchor and timeout flag cells.
//!
//! Both cells are written from interrupt or timer context and read by the
//! sampler task. Each write is a single atomic operation; the only
//! check-then-set is [`SessionAnchor::try_open`], which is one
//! compare-exchange.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::clock::Ticks;

/// Sentinel tick value meaning "no session open".
pub const NO_SESSION: Ticks = 0;

/// Tick at which the current decoding session started.
///
/// Opened by the edge detector on the first rising edge of a pulse train,
/// advanced by the sampler as its absolute sampling clock, and closed by the
/// sampler when it is ready for the next digit.
pub struct SessionAnchor {
    tick: AtomicU32,
}

impl SessionAnchor {
    /// Create a closed anchor.
    pub const fn new() -> Self {
        SessionAnchor {
            tick: AtomicU32::new(NO_SESSION),
        }
    }

    /// Open a session at `now` unless one is already open.
    ///
    /// Returns `true` if this call opened the session. Bounded time, never
    /// blocks; safe from interrupt context.
    #[inline]
    pub fn try_open(&self, now: Ticks) -> bool {
        self.tick
            .compare_exchange(
                NO_SESSION,
                non_sentinel(now),
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Move the anchor of an open session forward to `tick`.
    pub fn advance(&self, tick: Ticks) {
        self.tick.store(non_sentinel(tick), Ordering::Release);
    }

    /// Close the session so the next rising edge opens a new one.
    pub fn close(&self) {
        self.tick.store(NO_SESSION, Ordering::Release);
    }

    /// The anchor tick, or `None` if no session is open.
    pub fn get(&self) -> Option<Ticks> {
        match self.tick.load(Ordering::Acquire) {
            NO_SESSION => None,
            tick => Some(tick),
        }
    }

    /// Whether a session is open.
    pub fn is_open(&self) -> bool {
        self.get().is_some()
    }
}

impl Default for SessionAnchor {
    fn default() -> Self {
        Self::new()
    }
}

// A tick count of exactly zero would read back as "closed", so it is nudged
// by one tick.
#[inline]
fn non_sentinel(tick: Ticks) -> Ticks {
    if tick == NO_SESSION {
        1
    } else {
        tick
    }
}

/// Set when the wake signal was given by the inter-digit timeout rather than
/// by a pulse train.
pub struct TimeoutFlag {
    raised: AtomicBool,
}

impl TimeoutFlag {
    pub const fn new() -> Self {
        TimeoutFlag {
            raised: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

impl Default for TimeoutFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_starts_closed() {
        let anchor = SessionAnchor::new();
        assert!(!anchor.is_open());
        assert_eq!(anchor.get(), None);
    }

    #[test]
    fn first_open_wins() {
        let anchor = SessionAnchor::new();
        assert!(anchor.try_open(500));
        assert!(!anchor.try_open(560));
        assert_eq!(anchor.get(), Some(500));
    }

    #[test]
    fn close_allows_reopen() {
        let anchor = SessionAnchor::new();
        assert!(anchor.try_open(10));
        anchor.close();
        assert!(anchor.try_open(20));
        assert_eq!(anchor.get(), Some(20));
    }

    #[test]
    fn zero_tick_still_opens() {
        let anchor = SessionAnchor::new();
        assert!(anchor.try_open(0));
        assert!(anchor.is_open());
        assert_eq!(anchor.get(), Some(1));
        assert!(!anchor.try_open(0));
    }

    #[test]
    fn advance_keeps_session_open() {
        let anchor = SessionAnchor::new();
        anchor.try_open(u32::MAX - 5);
        anchor.advance(0);
        assert!(anchor.is_open());
        anchor.advance(40);
        assert_eq!(anchor.get(), Some(40));
    }

    #[test]
    fn flag_raise_and_clear() {
        let flag = TimeoutFlag::new();
        assert!(!flag.is_raised());
        flag.raise();
        assert!(flag.is_raised());
        flag.clear();
        assert!(!flag.is_raised());
    }
}

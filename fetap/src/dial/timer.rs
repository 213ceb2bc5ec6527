//! Inter-digit timeout.
//!
//! After each accepted digit the aggregator restarts a one-shot timer. If no
//! further digit arrives before it expires, [`TimeoutHandler::on_expiry`]
//! raises the timeout flag and wakes the sampler through the same
//! [`WakeSignal`](crate::sync::WakeSignal) the edge detector uses, so the
//! sampler has a single wait point for both triggers.
//!
//! Platforms with a hardware one-shot timer implement [`OneShotTimer`]
//! directly and call `on_expiry()` from its callback. [`SoftTimer`] covers
//! the common case of a periodic tick interrupt: restart it from the task,
//! `poll()` it from the tick ISR.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::clock::{is_reached, Ticks};

use super::DialShared;

/// A one-shot deadline timer.
pub trait OneShotTimer {
    /// (Re)start the timer so it expires `period` ticks after `now`.
    ///
    /// A pending expiry is discarded, not extended.
    fn restart(&mut self, now: Ticks, period: Ticks);
}

/// Timer used when aggregation is disabled. Never fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTimer;

impl OneShotTimer for NoTimer {
    fn restart(&mut self, _now: Ticks, _period: Ticks) {}
}

/// Software one-shot timer over a monotonic tick.
///
/// # Contract
///
/// - [`restart()`](Self::restart) and [`cancel()`](Self::cancel) are called
///   from ONE context (the sampler task).
/// - [`poll()`](Self::poll) is called from ONE context (typically the tick
///   interrupt).
pub struct SoftTimer {
    deadline: AtomicU32,
    armed: AtomicBool,
}

impl SoftTimer {
    /// Create a disarmed timer.
    pub const fn new() -> Self {
        SoftTimer {
            deadline: AtomicU32::new(0),
            armed: AtomicBool::new(false),
        }
    }

    /// Arm the timer to expire at `now + period`, replacing any earlier deadline.
    pub fn restart(&self, now: Ticks, period: Ticks) {
        // Disarm first so a concurrent poll can't pair the old armed state
        // with the new deadline.
        self.armed.store(false, Ordering::Release);
        self.deadline
            .store(now.wrapping_add(period), Ordering::Release);
        self.armed.store(true, Ordering::Release);
    }

    /// Disarm without firing.
    pub fn cancel(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// The pending deadline, if armed.
    pub fn deadline(&self) -> Option<Ticks> {
        if self.is_armed() {
            Some(self.deadline.load(Ordering::Acquire))
        } else {
            None
        }
    }

    /// Check for expiry at `now`.
    ///
    /// Returns `true` exactly once per arming, on the first poll at or after
    /// the deadline.
    pub fn poll(&self, now: Ticks) -> bool {
        if !self.armed.load(Ordering::Acquire) {
            return false;
        }
        if !is_reached(now, self.deadline.load(Ordering::Acquire)) {
            return false;
        }
        self.armed.swap(false, Ordering::AcqRel)
    }
}

impl Default for SoftTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl OneShotTimer for &SoftTimer {
    fn restart(&mut self, now: Ticks, period: Ticks) {
        SoftTimer::restart(self, now, period);
    }
}

/// Timer-callback half of the dial decoder.
#[derive(Clone, Copy)]
pub struct TimeoutHandler<'a> {
    shared: &'a DialShared,
}

impl<'a> TimeoutHandler<'a> {
    pub const fn new(shared: &'a DialShared) -> Self {
        TimeoutHandler { shared }
    }

    /// Declare dialing finished and wake the sampler.
    ///
    /// Does not check the session anchor, so a timeout can always finish a
    /// number.
    #[inline]
    pub fn on_expiry(&self) {
        // Flag before wake: the sampler reads the flag after taking the wake.
        self.shared.timeout.raise();
        self.shared.wake.give();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_timer_is_disarmed() {
        let timer = SoftTimer::new();
        assert!(!timer.is_armed());
        assert_eq!(timer.deadline(), None);
        assert!(!timer.poll(0));
        assert!(!timer.poll(u32::MAX));
    }

    #[test]
    fn fires_once_at_deadline() {
        let timer = SoftTimer::new();
        timer.restart(1000, 3000);
        assert_eq!(timer.deadline(), Some(4000));

        assert!(!timer.poll(3999));
        assert!(timer.poll(4000));
        assert!(!timer.poll(4001));
        assert!(!timer.is_armed());
    }

    #[test]
    fn late_poll_still_fires() {
        let timer = SoftTimer::new();
        timer.restart(0, 10);
        assert!(timer.poll(250));
    }

    #[test]
    fn restart_replaces_deadline() {
        // T = 3000. Restart at T - 1 must push expiry to (T - 1) + T.
        let t = 3000;
        let timer = SoftTimer::new();
        timer.restart(0, t);
        timer.restart(t - 1, t);

        assert!(!timer.poll(t));
        assert!(!timer.poll(2 * t - 2));
        assert!(timer.poll(2 * t - 1));
    }

    #[test]
    fn cancel_prevents_expiry() {
        let timer = SoftTimer::new();
        timer.restart(0, 5);
        timer.cancel();
        assert!(!timer.poll(5));
    }

    #[test]
    fn deadline_wraps() {
        let timer = SoftTimer::new();
        timer.restart(u32::MAX - 1, 4);
        assert_eq!(timer.deadline(), Some(2));
        assert!(!timer.poll(u32::MAX));
        assert!(timer.poll(2));
    }

    #[test]
    fn restart_through_trait_reference() {
        let timer = SoftTimer::new();
        let mut handle = &timer;
        OneShotTimer::restart(&mut handle, 10, 20);
        assert_eq!(timer.deadline(), Some(30));
    }

    #[test]
    fn expiry_raises_flag_and_wakes() {
        let shared = DialShared::new();
        TimeoutHandler::new(&shared).on_expiry();
        assert!(shared.timeout.is_raised());
        assert!(shared.wake.try_take());
    }

    #[test]
    fn expiry_ignores_open_session() {
        let shared = DialShared::new();
        shared.anchor.try_open(50);
        TimeoutHandler::new(&shared).on_expiry();
        assert!(shared.wake.is_pending());
        assert_eq!(shared.anchor.get(), Some(50));
    }
}

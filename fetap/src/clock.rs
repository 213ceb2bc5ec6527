//! Monotonic time source used by the dial sampler.

/// A monotonic tick count. Wraps around on overflow.
pub type Ticks = u32;

/// Platform clock for the sampler task.
///
/// `delay_until` takes an absolute deadline rather than a duration, so the
/// sampling cadence stays locked to the first edge of a pulse train no
/// matter how long each loop iteration takes.
pub trait Monotonic {
    /// Tick frequency in Hz.
    const TICK_HZ: u32;

    /// Current tick count.
    fn now(&self) -> Ticks;

    /// Block until `deadline` has been reached. Returns immediately if it
    /// already has.
    fn delay_until(&mut self, deadline: Ticks);

    /// Called repeatedly while the sampler task waits for a wake signal.
    fn idle(&mut self) {
        core::hint::spin_loop();
    }

    /// Convert milliseconds to ticks of this clock.
    fn ms_to_ticks(ms: u32) -> Ticks {
        ms_to_ticks(ms, Self::TICK_HZ)
    }
}

/// Longest delay [`is_reached`] can tell apart from a deadline in the past.
pub const MAX_DELAY_TICKS: Ticks = i32::MAX as Ticks;

/// Convert milliseconds to ticks for a clock running at `tick_hz`.
///
/// Saturates at [`MAX_DELAY_TICKS`].
pub const fn ms_to_ticks(ms: u32, tick_hz: u32) -> Ticks {
    let ticks = (ms as u64 * tick_hz as u64) / 1000;
    if ticks > MAX_DELAY_TICKS as u64 {
        MAX_DELAY_TICKS
    } else {
        ticks as Ticks
    }
}

/// Whether `deadline` lies at or before `now`, tolerating wraparound.
///
/// Deadlines more than half the tick range in the future are treated as
/// already passed.
#[inline]
pub fn is_reached(now: Ticks, deadline: Ticks) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

//! Pulse counting on the dial line.
//!
//! A rotary dial returning to rest opens its contact once per pulse: 60 ms
//! open, 40 ms closed, `n` pulses for digit `n` (ten for `0`). The sampler
//! starts at the first rising edge and walks the expected pulse grid:
//!
//! ```text
//!  line   ┌──────┐    ┌──────┐    ┌──────┐
//!  open   │      │    │      │    │      │
//!  closed ┘      └────┘      └────┘      └──────────────
//!         |||||| .... |||||| .... |||||| ......  ||||||
//!         6 × 10 ms   6 × 10 ms   6 × 10 ms      all closed → stop
//!         pulse 1     pulse 2     pulse 3
//! ```
//!
//! The old contacts bounce and may not stay open for a whole window, so a
//! single open sample out of six confirms a pulse. Every deadline is derived
//! from the session anchor, never from the time a read returned, which keeps
//! the grid aligned with the dial's own mechanics over all ten pulses.

use embedded_hal::digital::InputPin;

use crate::clock::{Monotonic, Ticks};
use crate::constants::{MAX_PULSES, PULSE_CLOSED_MS, SAMPLES_PER_PULSE, SAMPLE_INTERVAL_MS};
use crate::sync::SessionAnchor;

/// Pulse grid timing, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseTiming {
    /// Spacing between samples inside the open period.
    pub sample_interval: Ticks,
    /// Samples per open period.
    pub samples_per_pulse: u32,
    /// Closed period following a confirmed pulse.
    pub closed: Ticks,
    /// Upper bound on counted pulses.
    pub max_pulses: u8,
}

impl PulseTiming {
    /// IWV timing for a clock running at `tick_hz`.
    pub const fn iwv(tick_hz: u32) -> Self {
        PulseTiming {
            sample_interval: crate::clock::ms_to_ticks(SAMPLE_INTERVAL_MS, tick_hz),
            samples_per_pulse: SAMPLES_PER_PULSE,
            closed: crate::clock::ms_to_ticks(PULSE_CLOSED_MS, tick_hz),
            max_pulses: MAX_PULSES,
        }
    }
}

/// Map a pulse count to the dialed digit. Ten pulses encode `0`.
///
/// Returns `None` for zero pulses (noise).
pub fn digit_for(pulses: u8) -> Option<u8> {
    match pulses {
        0 => None,
        n => Some(n % 10),
    }
}

/// Samples the dial line over one pulse train.
pub struct PulseSampler<P, M> {
    line: P,
    clock: M,
    timing: PulseTiming,
}

impl<P, M> PulseSampler<P, M>
where
    P: InputPin,
    M: Monotonic,
{
    /// Create a sampler with IWV timing for `M`'s tick rate.
    pub fn new(line: P, clock: M) -> Self {
        Self::with_timing(line, clock, PulseTiming::iwv(M::TICK_HZ))
    }

    pub fn with_timing(line: P, clock: M, timing: PulseTiming) -> Self {
        PulseSampler {
            line,
            clock,
            timing,
        }
    }

    /// Count the pulses of the train anchored at `anchor`.
    ///
    /// Blocks for roughly 100 ms per pulse. The anchor is advanced to each
    /// sampling deadline as it passes. Returns 0 if no session is open or no
    /// pulse was confirmed, and never more than `max_pulses`.
    pub fn count_pulses(&mut self, anchor: &SessionAnchor) -> u8 {
        let Some(mut deadline) = anchor.get() else {
            return 0;
        };

        let mut pulses = 0;
        while pulses < self.timing.max_pulses {
            let mut open = false;
            for _ in 0..self.timing.samples_per_pulse {
                open |= self.line_is_open();
                deadline = deadline.wrapping_add(self.timing.sample_interval);
                self.clock.delay_until(deadline);
                anchor.advance(deadline);
            }

            if !open {
                // Whole window closed: the train has ended.
                break;
            }
            pulses += 1;

            deadline = deadline.wrapping_add(self.timing.closed);
            self.clock.delay_until(deadline);
            anchor.advance(deadline);
        }

        pulses
    }

    // Read errors count as a closed contact.
    fn line_is_open(&mut self) -> bool {
        self.line.is_high().unwrap_or(false)
    }

    pub fn timing(&self) -> PulseTiming {
        self.timing
    }

    pub fn clock(&self) -> &M {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut M {
        &mut self.clock
    }

    /// Give back the line and the clock.
    pub fn release(self) -> (P, M) {
        (self.line, self.clock)
    }
}

//! Simulated hardware for unit and integration tests.
//!
//! Time only moves when the code under test sleeps (`delay_until`, `idle`)
//! or a test calls [`SimTime::set`]. The dial line derives its level from
//! the simulated time, so a sampler driven by [`SimClock`] sees exactly the
//! pulse train a real dial would produce.

extern crate std;

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::string::String;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType, InputPin};

use crate::audio::{I2sChannel, I2sConfig, I2sRead, I2sWrite};
use crate::clock::{Monotonic, Ticks};
use crate::constants::{PULSE_CLOSED_MS, PULSE_OPEN_MS};

/// Shared simulated time plus a log of every dial line read.
pub struct SimTime {
    now: Cell<Ticks>,
    reads: RefCell<Vec<Ticks>>,
}

impl SimTime {
    pub fn new(start: Ticks) -> Self {
        SimTime {
            now: Cell::new(start),
            reads: RefCell::new(Vec::new()),
        }
    }

    pub fn now(&self) -> Ticks {
        self.now.get()
    }

    pub fn set(&self, tick: Ticks) {
        self.now.set(tick);
    }

    pub fn advance(&self, ticks: Ticks) {
        self.now.set(self.now.get().wrapping_add(ticks));
    }

    /// Timestamps of all line reads so far.
    pub fn reads(&self) -> Vec<Ticks> {
        self.reads.borrow().clone()
    }
}

/// 1 kHz clock over a [`SimTime`]: one tick per millisecond.
pub struct SimClock<'a> {
    time: &'a SimTime,
}

impl<'a> SimClock<'a> {
    pub fn new(time: &'a SimTime) -> Self {
        SimClock { time }
    }
}

impl Monotonic for SimClock<'_> {
    const TICK_HZ: u32 = 1000;

    fn now(&self) -> Ticks {
        self.time.now()
    }

    fn delay_until(&mut self, deadline: Ticks) {
        if !crate::clock::is_reached(self.time.now(), deadline) {
            self.time.set(deadline);
        }
    }

    fn idle(&mut self) {
        self.time.advance(1);
    }
}

/// One dialed digit as seen on the line: `pulses` open/closed cycles
/// starting at `start`.
#[derive(Clone, Copy, Debug)]
pub struct PulseTrain {
    pub start: Ticks,
    pub pulses: u8,
    pub open_ms: Ticks,
    pub closed_ms: Ticks,
}

impl PulseTrain {
    /// A train with nominal IWV timing.
    pub fn new(start: Ticks, pulses: u8) -> Self {
        PulseTrain {
            start,
            pulses,
            open_ms: PULSE_OPEN_MS,
            closed_ms: PULSE_CLOSED_MS,
        }
    }

    /// Tick at which the last pulse has closed again.
    pub fn end(&self) -> Ticks {
        self.start + self.pulses as Ticks * (self.open_ms + self.closed_ms)
    }

    pub fn is_open_at(&self, t: Ticks) -> bool {
        if t < self.start {
            return false;
        }
        let offset = t - self.start;
        let period = self.open_ms + self.closed_ms;
        offset / period < self.pulses as Ticks && offset % period < self.open_ms
    }
}

/// Dial contact driven by a list of pulse trains. Logs each read.
pub struct SimLine<'a> {
    time: &'a SimTime,
    trains: Vec<PulseTrain>,
    /// Ticks at which the line reads open regardless of the trains (noise).
    glitches: Vec<Ticks>,
}

impl<'a> SimLine<'a> {
    pub fn new(time: &'a SimTime) -> Self {
        SimLine {
            time,
            trains: Vec::new(),
            glitches: Vec::new(),
        }
    }

    pub fn with_train(mut self, train: PulseTrain) -> Self {
        self.trains.push(train);
        self
    }

    pub fn with_glitch(mut self, tick: Ticks) -> Self {
        self.glitches.push(tick);
        self
    }
}

impl ErrorType for SimLine<'_> {
    type Error = Infallible;
}

impl InputPin for SimLine<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let t = self.time.now();
        self.time.reads.borrow_mut().push(t);
        Ok(self.glitches.contains(&t) || self.trains.iter().any(|tr| tr.is_open_at(t)))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Collects published numbers.
pub struct Published<'a> {
    numbers: &'a RefCell<Vec<String>>,
}

impl<'a> Published<'a> {
    pub fn new(numbers: &'a RefCell<Vec<String>>) -> Self {
        Published { numbers }
    }
}

impl crate::dial::NumberSink for Published<'_> {
    fn publish(&mut self, number: &str) {
        self.numbers.borrow_mut().push(String::from(number));
    }
}

/// Error produced by [`SimI2s`] when a failure is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimI2sError;

/// I2S channel with scripted receive data and a log of transmitted samples.
pub struct SimI2s {
    pub config: Option<I2sConfig>,
    pub enabled: bool,
    pub fail_init: bool,
    pub fail_enable: bool,
    pub fail_disable: bool,
    pub fail_io: bool,
    /// Raw 32-bit words handed out by `read`, front first.
    pub rx: Vec<i32>,
    /// Samples accepted by `write`.
    pub tx: Vec<i16>,
    /// Accept at most this many samples per `write`.
    pub write_limit: Option<usize>,
    pub last_timeout: Option<u32>,
}

impl SimI2s {
    pub fn new() -> Self {
        SimI2s {
            config: None,
            enabled: false,
            fail_init: false,
            fail_enable: false,
            fail_disable: false,
            fail_io: false,
            rx: Vec::new(),
            tx: Vec::new(),
            write_limit: None,
            last_timeout: None,
        }
    }
}

impl I2sChannel for SimI2s {
    type Error = SimI2sError;

    fn init(&mut self, config: &I2sConfig) -> Result<(), Self::Error> {
        if self.fail_init {
            return Err(SimI2sError);
        }
        self.config = Some(*config);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), Self::Error> {
        if self.fail_enable {
            return Err(SimI2sError);
        }
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        if self.fail_disable {
            return Err(SimI2sError);
        }
        self.enabled = false;
        Ok(())
    }
}

impl I2sRead for SimI2s {
    fn read(&mut self, buf: &mut [i32], timeout_ms: u32) -> Result<usize, Self::Error> {
        self.last_timeout = Some(timeout_ms);
        if self.fail_io {
            return Err(SimI2sError);
        }
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl I2sWrite for SimI2s {
    fn write(&mut self, samples: &[i16], timeout_ticks: u32) -> Result<usize, Self::Error> {
        self.last_timeout = Some(timeout_ticks);
        if self.fail_io {
            return Err(SimI2sError);
        }
        let n = self.write_limit.map_or(samples.len(), |limit| limit.min(samples.len()));
        self.tx.extend_from_slice(&samples[..n]);
        Ok(n)
    }
}

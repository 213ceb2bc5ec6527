//! Rotary dial decoder.
//!
//! Three execution contexts cooperate through the cells in [`DialShared`]:
//!
//! ```text
//!  GPIO ISR (rising edge)      tick ISR / timer callback
//!  ┌──────────────┐            ┌─────────────────┐
//!  │ EdgeDetector │            │ TimeoutHandler  │
//!  └──────┬───────┘            └────────┬────────┘
//!         │ open anchor, give           │ raise flag, give
//!         ▼                             ▼
//!      ┌──────────────────────────────────────┐
//!      │              WakeSignal              │
//!      └──────────────────┬───────────────────┘
//!                         │ take
//!                         ▼
//!      ┌──────────────────────────────────────┐
//!      │ DialTask: PulseSampler → digit_for → │
//!      │ NumberAggregator → NumberSink        │
//!      └──────────────────────────────────────┘
//! ```
//!
//! A [`DialSensor`] is built from the platform pieces and turned into a
//! runnable [`DialTask`] by [`DialSensor::setup`]. If any interrupt setup
//! step fails there is no task to run.
//!
//! ## Usage
//!
//! ```ignore
//! static DIAL: DialShared = DialShared::new();
//! static TIMEOUT: SoftTimer = SoftTimer::new();
//!
//! let config = DialConfig::new(4).with_timeout_ms(3000);
//! let sensor = DialSensor::new(config, &DIAL, line, clock, sink, &TIMEOUT);
//! let mut task = sensor.setup(&mut gpio_interrupts)?;
//! task.run();
//! ```

use core::fmt;

use embedded_hal::digital::InputPin;

use crate::clock::{Monotonic, Ticks};
use crate::constants::{DEFAULT_DIAL_TIMEOUT_MS, DIGIT_GAP_MS};
use crate::sync::{SessionAnchor, TimeoutFlag, WakeSignal};

pub mod edge;
pub mod number;
pub mod sampler;
pub mod timer;

pub use edge::EdgeDetector;
pub use number::{DialedNumber, NumberAggregator, NumberSink, QueueSink};
pub use sampler::{digit_for, PulseSampler, PulseTiming};
pub use timer::{NoTimer, OneShotTimer, SoftTimer, TimeoutHandler};


/// State shared by the edge ISR, the timeout callback and the sampler task.
///
/// `const` constructible so it can live in a `static`.
pub struct DialShared {
    pub anchor: SessionAnchor,
    pub wake: WakeSignal,
    pub timeout: TimeoutFlag,
}

impl DialShared {
    pub const fn new() -> Self {
        DialShared {
            anchor: SessionAnchor::new(),
            wake: WakeSignal::new(),
            timeout: TimeoutFlag::new(),
        }
    }
}

impl Default for DialShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Dial sensor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DialConfig {
    /// GPIO number of the dial pulse contact.
    pub pin: u8,
    /// Inter-digit timeout. `0` publishes every digit on its own.
    ///
    /// Capped at [`MAX_DELAY_TICKS`](crate::clock::MAX_DELAY_TICKS) ticks of
    /// the sampler clock (about 24 days at 1 kHz).
    pub timeout_ms: u32,
}

impl DialConfig {
    pub const fn new(pin: u8) -> Self {
        DialConfig {
            pin,
            timeout_ms: DEFAULT_DIAL_TIMEOUT_MS,
        }
    }

    /// Aggregate digits into a number until `timeout_ms` pass without one.
    pub const fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn aggregates(&self) -> bool {
        self.timeout_ms > 0
    }
}

impl Default for DialConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Platform rising-edge interrupt for the dial pin.
///
/// The pin must be configured as an input with pull-up, interrupting on the
/// rising edge. The registered handler calls
/// [`EdgeDetector::on_rising_edge`].
pub trait DialInterrupt {
    type Error;

    /// Install the platform's GPIO interrupt service.
    fn install_isr_service(&mut self) -> Result<(), Self::Error>;

    /// Configure `pin` as pulled-up input, rising-edge triggered.
    fn configure_pin(&mut self, pin: u8) -> Result<(), Self::Error>;

    /// Attach the edge handler to `pin`.
    fn register_handler(&mut self, pin: u8) -> Result<(), Self::Error>;
}

/// Interrupt setup step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupError<E> {
    IsrService(E),
    PinConfig(E),
    HandlerRegistration(E),
}

impl<E> SetupError<E> {
    /// The driver error behind this failure.
    pub fn into_inner(self) -> E {
        match self {
            SetupError::IsrService(e)
            | SetupError::PinConfig(e)
            | SetupError::HandlerRegistration(e) => e,
        }
    }

    fn step(&self) -> &'static str {
        match self {
            SetupError::IsrService(_) => "ISR service installation",
            SetupError::PinConfig(_) => "pin configuration",
            SetupError::HandlerRegistration(_) => "handler registration",
        }
    }
}

impl<E: fmt::Debug> fmt::Display for SetupError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dial sensor {} failed: {:?}", self.step(), self)
    }
}

/// What one handled wake did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionOutcome {
    /// A pulse train was decoded into this digit.
    Digit(u8),
    /// The inter-digit timeout fired and the number was published.
    Published,
    /// The session saw no pulse and was discarded.
    Noise,
    /// A timeout wake whose session already produced a digit.
    Superseded,
}

/// Dial decoder before interrupt setup.
pub struct DialSensor<'a, P, M, S, T> {
    config: DialConfig,
    shared: &'a DialShared,
    sampler: PulseSampler<P, M>,
    sink: S,
    timer: T,
}

impl<'a, P, M, S, T> DialSensor<'a, P, M, S, T>
where
    P: InputPin,
    M: Monotonic,
    S: NumberSink,
    T: OneShotTimer,
{
    /// Assemble a sensor. Closes any session left in `shared`.
    ///
    /// `timer` is only used when `config.timeout_ms > 0`; pass [`NoTimer`]
    /// otherwise.
    pub fn new(
        config: DialConfig,
        shared: &'a DialShared,
        line: P,
        clock: M,
        sink: S,
        timer: T,
    ) -> Self {
        shared.anchor.close();
        shared.timeout.clear();
        DialSensor {
            config,
            shared,
            sampler: PulseSampler::new(line, clock),
            sink,
            timer,
        }
    }

    /// Install the edge interrupt and hand back the sampler task.
    pub fn setup<I>(
        self,
        interrupts: &mut I,
    ) -> Result<DialTask<'a, P, M, S, T>, SetupError<I::Error>>
    where
        I: DialInterrupt,
    {
        let pin = self.config.pin;
        interrupts
            .install_isr_service()
            .map_err(SetupError::IsrService)
            .and_then(|()| interrupts.configure_pin(pin).map_err(SetupError::PinConfig))
            .and_then(|()| {
                interrupts
                    .register_handler(pin)
                    .map_err(SetupError::HandlerRegistration)
            })
            .map_err(|err| {
                error!("dial sensor {} failed on pin {}", err.step(), pin);
                err
            })?;

        info!(
            "dial sensor ready on pin {}, timeout {} ms",
            pin, self.config.timeout_ms
        );

        let DialSensor {
            config,
            shared,
            sampler,
            sink,
            timer,
        } = self;
        let timer = if config.aggregates() { Some(timer) } else { None };
        let timeout = M::ms_to_ticks(config.timeout_ms);

        Ok(DialTask {
            config,
            shared,
            sampler,
            number: NumberAggregator::new(&shared.timeout, sink, timer, timeout),
            digit_gap: M::ms_to_ticks(DIGIT_GAP_MS),
        })
    }
}

/// The sampler task: waits for wakes and decodes one session per wake.
pub struct DialTask<'a, P, M, S, T> {
    config: DialConfig,
    shared: &'a DialShared,
    sampler: PulseSampler<P, M>,
    number: NumberAggregator<'a, S, T>,
    digit_gap: Ticks,
}

impl<'a, P, M, S, T> DialTask<'a, P, M, S, T>
where
    P: InputPin,
    M: Monotonic,
    S: NumberSink,
    T: OneShotTimer,
{
    /// Decode sessions forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.run_session();
        }
    }

    /// Wait for the next wake, then handle it.
    pub fn run_session(&mut self) -> SessionOutcome {
        let shared = self.shared;
        let clock = self.sampler.clock_mut();
        shared.wake.take(|| clock.idle());
        self.handle_wake()
    }

    /// Handle a pending wake, if there is one.
    pub fn try_run_session(&mut self) -> Option<SessionOutcome> {
        if self.shared.wake.try_take() {
            Some(self.handle_wake())
        } else {
            None
        }
    }

    fn handle_wake(&mut self) -> SessionOutcome {
        if self.shared.timeout.is_raised() {
            self.number.emit();
            if self.shared.anchor.is_open() {
                // An edge arrived alongside the timeout and its wake was
                // absorbed by this one. Re-post it for the session.
                self.shared.wake.give();
            }
            return SessionOutcome::Published;
        }

        if !self.shared.anchor.is_open() {
            trace!("wake without open session");
            return SessionOutcome::Superseded;
        }

        let pulses = self.sampler.count_pulses(&self.shared.anchor);
        let end = self.sampler.clock().now();

        let outcome = match digit_for(pulses) {
            Some(digit) => {
                debug!("dialed digit {} ({} pulses)", digit, pulses);
                self.number.append_digit(digit, end);
                SessionOutcome::Digit(digit)
            }
            None => {
                trace!("no pulses, discarding session");
                SessionOutcome::Noise
            }
        };

        // Ignore the line until the dial has settled, then re-arm the edge
        // detector.
        self.sampler
            .clock_mut()
            .delay_until(end.wrapping_add(self.digit_gap));
        self.shared.anchor.close();

        outcome
    }

    pub fn config(&self) -> &DialConfig {
        &self.config
    }

    /// Digits accumulated but not yet published.
    pub fn number(&self) -> &str {
        self.number.number()
    }

    pub fn sink(&self) -> &S {
        self.number.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.number.sink_mut()
    }

    pub fn sampler(&self) -> &PulseSampler<P, M> {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::format;

    #[test]
    fn config_defaults_to_no_aggregation() {
        let config = DialConfig::default();
        assert_eq!(config.timeout_ms, 0);
        assert!(!config.aggregates());
    }

    #[test]
    fn config_builder() {
        let config = DialConfig::new(4).with_timeout_ms(3000);
        assert_eq!(config.pin, 4);
        assert_eq!(config.timeout_ms, 3000);
        assert!(config.aggregates());
    }

    #[test]
    fn setup_error_names_the_step() {
        let err: SetupError<i32> = SetupError::PinConfig(-5);
        assert_eq!(
            format!("{}", err),
            "dial sensor pin configuration failed: PinConfig(-5)"
        );
        assert_eq!(err.into_inner(), -5);
    }

    #[test]
    fn shared_starts_idle() {
        let shared = DialShared::new();
        assert!(!shared.anchor.is_open());
        assert!(!shared.wake.is_pending());
        assert!(!shared.timeout.is_raised());
    }
}

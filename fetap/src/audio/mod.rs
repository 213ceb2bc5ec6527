//! I2S microphone and speaker of the handset.
//!
//! Both components are thin state machines over a platform I2S channel.
//! `start()` and `stop()` only record a request; the transition happens on
//! the next `poll()`, which runs from the application's main loop.
//!
//! ```text
//!            start()            poll(): enable ok
//!  Stopped ──────────► Starting ─────────────────► Running
//!     ▲                   │ stop()                    │ stop()
//!     │                   ▼                           ▼
//!     └─────────────── Stopped ◄──────────────── Stopping
//!                               poll(): disable ok
//! ```
//!
//! A failed `setup()` marks the component failed for good; every later
//! request is ignored. Driver errors during `poll()` keep the state and set
//! [`Status::Error`], so the transition is retried on the next poll.

use core::fmt;

use crate::constants::AUDIO_SAMPLE_RATE_HZ;

pub mod microphone;
pub mod speaker;

pub use microphone::Microphone;
pub use speaker::Speaker;

/// Control half of an I2S channel.
pub trait I2sChannel {
    type Error;

    /// Create the channel and configure clocks, slot and pins.
    fn init(&mut self, config: &I2sConfig) -> Result<(), Self::Error>;

    /// Start the bit clock and data transfer.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Stop the bit clock and data transfer.
    fn disable(&mut self) -> Result<(), Self::Error>;
}

/// Receive side of an I2S channel configured for 32-bit words.
pub trait I2sRead: I2sChannel {
    /// Read up to `buf.len()` words, waiting at most `timeout_ms`.
    ///
    /// Returns the number of words read.
    fn read(&mut self, buf: &mut [i32], timeout_ms: u32) -> Result<usize, Self::Error>;
}

/// Transmit side of an I2S channel configured for 16-bit words.
pub trait I2sWrite: I2sChannel {
    /// Write up to `samples.len()` words, waiting at most `timeout_ticks`
    /// driver ticks.
    ///
    /// Returns the number of words written.
    fn write(&mut self, samples: &[i16], timeout_ticks: u32) -> Result<usize, Self::Error>;
}

/// Data word width on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitWidth {
    Bits16,
    Bits32,
}

/// Which slot of the stereo frame carries the mono signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    Left,
    Right,
}

/// GPIO numbers of the I2S bus. `data` is DIN for the microphone and DOUT
/// for the speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2sPins {
    pub bclk: u8,
    pub lrclk: u8,
    pub data: u8,
}

/// Standard-mode (Philips/MSB) channel configuration, master role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2sConfig {
    pub sample_rate_hz: u32,
    pub bit_width: BitWidth,
    pub slot: Slot,
    pub pins: I2sPins,
}

impl I2sConfig {
    /// 16 kHz, 32-bit mono words in the left slot.
    pub const fn microphone(pins: I2sPins) -> Self {
        I2sConfig {
            sample_rate_hz: AUDIO_SAMPLE_RATE_HZ,
            bit_width: BitWidth::Bits32,
            slot: Slot::Left,
            pins,
        }
    }

    /// 16 kHz, 16-bit mono words in the left slot.
    pub const fn speaker(pins: I2sPins) -> Self {
        I2sConfig {
            sample_rate_hz: AUDIO_SAMPLE_RATE_HZ,
            bit_width: BitWidth::Bits16,
            slot: Slot::Left,
            pins,
        }
    }
}

/// An I2S driver call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AudioError<E> {
    Init(E),
    Enable(E),
    Disable(E),
    Io(E),
}

impl<E: fmt::Debug> fmt::Display for AudioError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Init(e) => write!(f, "I2S channel init failed: {:?}", e),
            AudioError::Enable(e) => write!(f, "I2S channel enable failed: {:?}", e),
            AudioError::Disable(e) => write!(f, "I2S channel disable failed: {:?}", e),
            AudioError::Io(e) => write!(f, "I2S transfer failed: {:?}", e),
        }
    }
}

/// Stream lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Health reported to the application. An error outranks a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,
    Warning,
    Error,
}

/// State, status and failure latch shared by both components.
struct Lifecycle {
    name: &'static str,
    state: StreamState,
    status: Status,
    failed: bool,
}

impl Lifecycle {
    const fn new(name: &'static str) -> Self {
        Lifecycle {
            name,
            state: StreamState::Stopped,
            status: Status::Ok,
            failed: false,
        }
    }

    fn setup<C: I2sChannel>(
        &mut self,
        channel: &mut C,
        config: &I2sConfig,
    ) -> Result<(), AudioError<C::Error>> {
        match channel.init(config) {
            Ok(()) => {
                info!("{}: I2S channel initialized", self.name);
                Ok(())
            }
            Err(e) => {
                warn!("{}: initializing I2S channel failed", self.name);
                self.failed = true;
                self.status = Status::Error;
                Err(AudioError::Init(e))
            }
        }
    }

    /// Apply a pending start or stop request.
    fn step<C: I2sChannel>(&mut self, channel: &mut C) -> Result<(), AudioError<C::Error>> {
        match self.state {
            StreamState::Starting => {
                channel.enable().map_err(|e| {
                    warn!("{}: enabling I2S channel failed", self.name);
                    self.status = Status::Error;
                    AudioError::Enable(e)
                })?;
                self.state = StreamState::Running;
                self.clear_error();
                info!("{}: started", self.name);
            }
            StreamState::Stopping => {
                channel.disable().map_err(|e| {
                    warn!("{}: disabling I2S channel failed", self.name);
                    self.status = Status::Error;
                    AudioError::Disable(e)
                })?;
                self.state = StreamState::Stopped;
                self.clear_error();
                info!("{}: stopped", self.name);
            }
            StreamState::Stopped | StreamState::Running => {}
        }
        Ok(())
    }

    fn set_warning(&mut self) {
        if self.status == Status::Ok {
            self.status = Status::Warning;
        }
    }

    fn clear_warning(&mut self) {
        if self.status == Status::Warning {
            self.status = Status::Ok;
        }
    }

    fn clear_error(&mut self) {
        if self.status == Status::Error {
            self.status = Status::Ok;
        }
    }
}

//! # fetap
//!
//! A `no_std`, zero-allocation driver set for retrofitting a FeTAp rotary
//! telephone: decode the pulse dial into numbers and run the handset's I2S
//! microphone and speaker. Written against `embedded-hal` 1.0, so it runs on
//! any MCU that provides a GPIO input, a monotonic tick and an edge interrupt.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Time | [`clock`] | `Monotonic` tick source with absolute-deadline delays |
//! | Sync | [`sync`] | Lock-free wake signal, session anchor, timeout flag |
//! | Dial | [`dial`] | Edge ISR, pulse sampler, inter-digit timer, number aggregation |
//! | Audio | [`audio`] | I2S microphone and speaker state machines |
//!
//! ## Quick start
//!
//! ```ignore
//! use fetap::dial::{DialConfig, DialSensor, DialShared, EdgeDetector, SoftTimer, TimeoutHandler};
//!
//! static DIAL: DialShared = DialShared::new();
//! static TIMEOUT: SoftTimer = SoftTimer::new();
//!
//! // GPIO ISR, rising edge on the dial contact:
//! EdgeDetector::new(&DIAL).on_rising_edge(now());
//!
//! // 1 kHz tick ISR:
//! if TIMEOUT.poll(now()) {
//!     TimeoutHandler::new(&DIAL).on_expiry();
//! }
//!
//! // Sampler task:
//! let config = DialConfig::new(4).with_timeout_ms(3000);
//! let sensor = DialSensor::new(config, &DIAL, line, clock, |n: &str| call(n), &TIMEOUT);
//! sensor.setup(&mut interrupts)?.run();
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `defmt` | no | Logging through `defmt`, `defmt::Format` on public types |
//!
//! ## Dial parameters
//!
//! - **Pulse:** 60 ms open, 40 ms closed ([`constants::PULSE_OPEN_MS`])
//! - **Sampling:** 6 samples per open period, 10 ms apart
//! - **Digit gap:** 200 ms ([`constants::DIGIT_GAP_MS`])
//! - **Number:** up to 32 digits ([`constants::MAX_NUMBER_DIGITS`])

#![no_std]

#[macro_use]
mod fmt;

pub mod constants;
pub mod clock;
pub mod sync;
pub mod dial;
pub mod audio;

#[cfg(test)]
mod testing;

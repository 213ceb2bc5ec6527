//! Timing and buffer constants.
//!
//! The dial timings follow the German IWV pulse dialing standard: each pulse
//! opens the contact for 60 ms and closes it for 40 ms (10 pulses/s).

/// Duration for which the dial contact is open during each pulse.
pub const PULSE_OPEN_MS: u32 = 60;

/// Duration for which the dial contact is closed between two pulses.
pub const PULSE_CLOSED_MS: u32 = 40;

/// Number of line samples taken while the contact is expected to be open.
pub const SAMPLES_PER_PULSE: u32 = 6;

/// Spacing between two samples inside the open period.
pub const SAMPLE_INTERVAL_MS: u32 = PULSE_OPEN_MS / SAMPLES_PER_PULSE;

/// Minimum time between the end of one digit and the start of the next.
pub const DIGIT_GAP_MS: u32 = (PULSE_OPEN_MS + PULSE_CLOSED_MS) * 2;

/// Highest number of pulses a single digit can produce (digit `0`).
pub const MAX_PULSES: u8 = 10;

/// Inter-digit timeout used when none is configured. Zero disables aggregation.
pub const DEFAULT_DIAL_TIMEOUT_MS: u32 = 0;

/// Capacity of the dialed number buffer.
pub const MAX_NUMBER_DIGITS: usize = 32;

const _: () = assert!(
    PULSE_OPEN_MS % SAMPLES_PER_PULSE == 0,
    "pulse open period must divide evenly into samples"
);

/// Audio sample rate of both I2S channels.
pub const AUDIO_SAMPLE_RATE_HZ: u32 = 16_000;

/// Number of 32-bit words read from the microphone per poll.
pub const MIC_FRAME_SAMPLES: usize = 256;

/// Right shift applied to raw 32-bit microphone words before saturating to `i16`.
pub const MIC_SAMPLE_SHIFT: u32 = 13;

/// Maximum time a microphone read may block.
pub const MIC_READ_TIMEOUT_MS: u32 = 100;

/// Right shift applied to speaker samples. Gain is `1 / 2^SPEAKER_GAIN_SHIFT`.
pub const SPEAKER_GAIN_SHIFT: u32 = 4;

/// Default number of driver ticks a speaker write may block.
pub const SPEAKER_WRITE_TIMEOUT_TICKS: u32 = 100;

/// Size of the scratch buffer used to attenuate speaker samples.
pub const SPEAKER_CHUNK_SAMPLES: usize = 256;

//! I2S speaker amplifier.
//!
//! Samples go straight to the driver without a ring buffer. Each one is
//! attenuated by [`SPEAKER_GAIN_SHIFT`] bits on the way out, so the earpiece
//! plays at 1/16 of full scale.

use crate::constants::{SPEAKER_CHUNK_SAMPLES, SPEAKER_GAIN_SHIFT, SPEAKER_WRITE_TIMEOUT_TICKS};

use super::{AudioError, I2sConfig, I2sPins, I2sWrite, Lifecycle, StreamState, Status};

/// Speaker component over an I2S transmit channel.
pub struct Speaker<W> {
    channel: W,
    config: I2sConfig,
    life: Lifecycle,
    scratch: [i16; SPEAKER_CHUNK_SAMPLES],
}

impl<W: I2sWrite> Speaker<W> {
    pub fn new(channel: W, pins: I2sPins) -> Self {
        Speaker {
            channel,
            config: I2sConfig::speaker(pins),
            life: Lifecycle::new("speaker"),
            scratch: [0; SPEAKER_CHUNK_SAMPLES],
        }
    }

    /// Initialize the channel. On failure the speaker stays unusable.
    pub fn setup(&mut self) -> Result<(), AudioError<W::Error>> {
        self.life.setup(&mut self.channel, &self.config)
    }

    /// Request playback. Only honoured when stopped.
    pub fn start(&mut self) {
        if self.life.failed || self.life.state != StreamState::Stopped {
            return;
        }
        self.life.state = StreamState::Starting;
    }

    /// Request the end of playback. Only honoured when running.
    pub fn stop(&mut self) {
        if self.life.failed || self.life.state != StreamState::Running {
            return;
        }
        self.life.state = StreamState::Stopping;
    }

    /// Apply a pending start or stop request.
    pub fn poll(&mut self) -> Result<(), AudioError<W::Error>> {
        self.life.step(&mut self.channel)
    }

    /// Play `samples` (16 kHz mono PCM), waiting at most the default write
    /// timeout per chunk.
    ///
    /// Returns the number of samples handed to the driver.
    pub fn play(&mut self, samples: &[i16]) -> usize {
        self.play_with_timeout(samples, SPEAKER_WRITE_TIMEOUT_TICKS)
    }

    /// Like [`play`](Self::play), waiting at most `timeout_ticks` driver
    /// ticks per chunk.
    pub fn play_with_timeout(&mut self, samples: &[i16], timeout_ticks: u32) -> usize {
        let mut written = 0;
        for chunk in samples.chunks(SPEAKER_CHUNK_SAMPLES) {
            match self.write_chunk(chunk, timeout_ticks) {
                Ok(n) => {
                    written += n;
                    if n < chunk.len() {
                        // Driver timed out with its queue full.
                        break;
                    }
                }
                Err(_) => {
                    warn!("speaker: writing to I2S channel failed");
                    self.life.set_warning();
                    break;
                }
            }
        }
        written
    }

    fn write_chunk(
        &mut self,
        chunk: &[i16],
        timeout_ticks: u32,
    ) -> Result<usize, AudioError<W::Error>> {
        let out = &mut self.scratch[..chunk.len()];
        for (dst, &src) in out.iter_mut().zip(chunk) {
            *dst = src >> SPEAKER_GAIN_SHIFT;
        }
        self.channel.write(out, timeout_ticks).map_err(AudioError::Io)
    }

    /// Always `false`: nothing is held back from the driver.
    pub fn has_buffered_data(&self) -> bool {
        false
    }

    pub fn state(&self) -> StreamState {
        self.life.state
    }

    pub fn status(&self) -> Status {
        self.life.status
    }

    pub fn is_failed(&self) -> bool {
        self.life.failed
    }

    pub fn channel(&self) -> &W {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut W {
        &mut self.channel
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::SimI2s;
    use std::vec::Vec;

    const PINS: I2sPins = I2sPins {
        bclk: 27,
        lrclk: 14,
        data: 12,
    };

    fn running_speaker() -> Speaker<SimI2s> {
        let mut spk = Speaker::new(SimI2s::new(), PINS);
        spk.setup().unwrap();
        spk.start();
        spk.poll().unwrap();
        assert_eq!(spk.state(), StreamState::Running);
        spk
    }

    #[test]
    fn setup_configures_16bit_channel() {
        let mut spk = Speaker::new(SimI2s::new(), PINS);
        spk.setup().unwrap();
        assert_eq!(spk.channel().config, Some(I2sConfig::speaker(PINS)));
        assert!(!spk.has_buffered_data());
    }

    #[test]
    fn output_is_attenuated() {
        let mut spk = running_speaker();
        let n = spk.play(&[1600, -1600, 15, -1, i16::MAX, i16::MIN]);

        assert_eq!(n, 6);
        assert_eq!(spk.channel().tx, [100, -100, 0, -1, 2047, -2048]);
        assert_eq!(spk.channel().last_timeout, Some(SPEAKER_WRITE_TIMEOUT_TICKS));
    }

    #[test]
    fn long_buffers_go_out_in_chunks() {
        let mut spk = running_speaker();
        let samples: Vec<i16> = (0..600).map(|i| (i as i16) << 4).collect();

        assert_eq!(spk.play_with_timeout(&samples, 7), 600);
        let expected: Vec<i16> = (0..600).collect();
        assert_eq!(spk.channel().tx, expected);
        assert_eq!(spk.channel().last_timeout, Some(7));
    }

    #[test]
    fn partial_write_stops_early() {
        let mut spk = running_speaker();
        spk.channel_mut().write_limit = Some(100);
        let samples = [16i16; 600];

        assert_eq!(spk.play(&samples), 100);
        assert_eq!(spk.channel().tx.len(), 100);
    }

    #[test]
    fn write_error_is_a_warning() {
        let mut spk = running_speaker();
        spk.channel_mut().fail_io = true;

        assert_eq!(spk.play(&[1, 2, 3]), 0);
        assert_eq!(spk.status(), Status::Warning);
        assert_eq!(spk.state(), StreamState::Running);
    }

    #[test]
    fn start_only_from_stopped() {
        let mut spk = running_speaker();
        spk.stop();
        assert_eq!(spk.state(), StreamState::Stopping);
        spk.start();
        assert_eq!(spk.state(), StreamState::Stopping);

        spk.poll().unwrap();
        assert_eq!(spk.state(), StreamState::Stopped);
        assert!(!spk.channel().enabled);
    }

    #[test]
    fn stop_only_from_running() {
        let mut spk = Speaker::new(SimI2s::new(), PINS);
        spk.setup().unwrap();
        spk.start();
        spk.stop();
        // The start request stands until it has been applied.
        assert_eq!(spk.state(), StreamState::Starting);
    }

    #[test]
    fn enable_failure_keeps_starting() {
        let mut spk = Speaker::new(SimI2s::new(), PINS);
        spk.setup().unwrap();
        spk.channel_mut().fail_enable = true;
        spk.start();

        assert!(matches!(spk.poll(), Err(AudioError::Enable(_))));
        assert_eq!(spk.state(), StreamState::Starting);
        assert_eq!(spk.status(), Status::Error);
    }

    #[test]
    fn failed_setup_ignores_start() {
        let mut i2s = SimI2s::new();
        i2s.fail_init = true;
        let mut spk = Speaker::new(i2s, PINS);

        assert!(spk.setup().is_err());
        spk.start();
        assert_eq!(spk.state(), StreamState::Stopped);
        assert!(spk.is_failed());
    }
}

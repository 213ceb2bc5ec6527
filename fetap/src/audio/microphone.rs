//! I2S MEMS microphone.
//!
//! The microphone delivers 32-bit words with the sample in the upper bits.
//! [`Microphone::read`] scales them to 16-bit PCM by an arithmetic shift
//! right of [`MIC_SAMPLE_SHIFT`] and saturates.

use crate::constants::{MIC_FRAME_SAMPLES, MIC_READ_TIMEOUT_MS, MIC_SAMPLE_SHIFT};

use super::{AudioError, I2sConfig, I2sPins, I2sRead, Lifecycle, StreamState, Status};

/// Microphone component over an I2S receive channel.
pub struct Microphone<R> {
    channel: R,
    config: I2sConfig,
    life: Lifecycle,
    raw: [i32; MIC_FRAME_SAMPLES],
}

impl<R: I2sRead> Microphone<R> {
    pub fn new(channel: R, pins: I2sPins) -> Self {
        Microphone {
            channel,
            config: I2sConfig::microphone(pins),
            life: Lifecycle::new("microphone"),
            raw: [0; MIC_FRAME_SAMPLES],
        }
    }

    /// Initialize the channel. On failure the microphone stays unusable.
    pub fn setup(&mut self) -> Result<(), AudioError<R::Error>> {
        self.life.setup(&mut self.channel, &self.config)
    }

    /// Request capture. Ignored while running or after a failed setup.
    pub fn start(&mut self) {
        if self.life.state == StreamState::Running || self.life.failed {
            return;
        }
        self.life.state = StreamState::Starting;
    }

    /// Request the end of capture. A pending start is simply dropped.
    pub fn stop(&mut self) {
        if self.life.state == StreamState::Stopped || self.life.failed {
            return;
        }
        self.life.state = match self.life.state {
            StreamState::Starting => StreamState::Stopped,
            _ => StreamState::Stopping,
        };
    }

    /// Advance the state machine. While running, reads one frame and hands
    /// it to `on_data`.
    pub fn poll(
        &mut self,
        mut on_data: impl FnMut(&[i16]),
    ) -> Result<(), AudioError<R::Error>> {
        if self.life.state != StreamState::Running {
            return self.life.step(&mut self.channel);
        }

        let mut frame = [0i16; MIC_FRAME_SAMPLES];
        let n = self.read(&mut frame);
        on_data(&frame[..n]);
        Ok(())
    }

    /// Read up to `buf.len()` samples (at most one frame) as 16-bit PCM.
    ///
    /// Returns the number of samples written to `buf`. Driver errors and
    /// empty reads return 0 and set [`Status::Warning`].
    pub fn read(&mut self, buf: &mut [i16]) -> usize {
        match self.try_read(buf) {
            Ok(0) => {
                self.life.set_warning();
                0
            }
            Ok(n) => {
                self.life.clear_warning();
                n
            }
            Err(_) => {
                warn!("microphone: reading from I2S channel failed");
                self.life.set_warning();
                0
            }
        }
    }

    fn try_read(&mut self, buf: &mut [i16]) -> Result<usize, AudioError<R::Error>> {
        let len = buf.len().min(MIC_FRAME_SAMPLES);
        let n = self
            .channel
            .read(&mut self.raw[..len], MIC_READ_TIMEOUT_MS)
            .map_err(AudioError::Io)?
            .min(len);

        for (dst, &raw) in buf.iter_mut().zip(&self.raw[..n]) {
            *dst = to_pcm16(raw);
        }
        Ok(n)
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

    pub fn channel(&self) -> &R {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut R {
        &mut self.channel
    }
}

#[inline]
fn to_pcm16(raw: i32) -> i16 {
    (raw >> MIC_SAMPLE_SHIFT).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

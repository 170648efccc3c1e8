//! Progress accounting.
//!
//! Elapsed time is derived from what the decoder consumed and produced, never
//! from wall-clock time, so pauses and stalls do not advance it.

use std::time::Duration;

/// Known total duration and source length of a session, used to derive
/// elapsed time from bytes consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub duration_ms: u64,
    pub length: u64,
}

impl Calibration {
    /// `None` unless both are known and non-zero. Durations under a
    /// millisecond count as zero.
    pub fn new(duration: Option<Duration>, length: Option<u64>) -> Option<Self> {
        let duration_ms = duration?.as_millis() as u64;
        let length = length?;
        (duration_ms > 0 && length > 0).then_some(Self { duration_ms, length })
    }

    /// Milliseconds of audio represented by the first `bytes` of the source.
    ///
    /// Exact for constant-bitrate streams only.
    pub fn elapsed_for(&self, bytes: u64) -> u64 {
        (bytes as u128 * self.duration_ms as u128 / self.length as u128) as u64
    }
}

/// Progress counters of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Encoded bytes handed to the decoder, reset to the seek target on seek.
    pub bytes_consumed: u64,
    pub pcm_frames_written: u64,
    pub elapsed_ms: u64,
    /// Sub-millisecond remainder of frame accumulation, in frame-milliseconds.
    remainder: u64,
}

impl Progress {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_read(&mut self, bytes: usize) {
        self.bytes_consumed += bytes as u64;
    }

    /// Accounts one PCM write of `frames` frames at `sample_rate`.
    ///
    /// A decoder-supplied source time wins. Otherwise time accumulates from
    /// frames, and is then recalibrated from bytes consumed when the session
    /// has a known duration and length.
    pub fn record_write(
        &mut self,
        frames: u64,
        sample_rate: u32,
        hint: Option<Duration>,
        calibration: Option<Calibration>,
    ) {
        self.pcm_frames_written += frames;

        if let Some(hint) = hint {
            self.elapsed_ms = hint.as_millis() as u64;
            self.remainder = 0;
            return;
        }

        if sample_rate > 0 {
            let scaled = frames * 1000 + self.remainder;
            self.elapsed_ms += scaled / sample_rate as u64;
            self.remainder = scaled % sample_rate as u64;
        }

        if let Some(calibration) = calibration {
            self.elapsed_ms = calibration.elapsed_for(self.bytes_consumed);
        }
    }

    /// Positions the counters after a seek to `offset` bytes / `elapsed_ms`.
    pub fn seek_to(&mut self, offset: u64, elapsed_ms: u64) {
        self.bytes_consumed = offset;
        self.elapsed_ms = elapsed_ms;
        self.remainder = 0;
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_ms / 1000
    }

    /// Extrapolates the total duration from how much of `length` produced
    /// the current elapsed time. `None` until something has been consumed.
    pub fn estimated_duration(&self, length: u64) -> Option<Duration> {
        if self.bytes_consumed == 0 || self.elapsed_ms == 0 {
            return None;
        }
        let total_ms = self.elapsed_ms as u128 * length as u128 / self.bytes_consumed as u128;
        Some(Duration::from_millis(total_ms as u64))
    }
}

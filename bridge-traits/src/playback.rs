//! Playback bridge traits and supporting audio types.
//!
//! The core never talks to audio hardware directly. Hosts provide an
//! [`AudioOutput`] that opens an [`AudioSink`] for a given PCM format; the core
//! pushes interleaved signed 16-bit samples into it from the decode thread.

use crate::error::Result;

/// Interleaved 16-bit PCM layout expected by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Number of whole frames contained in `samples` interleaved samples.
    pub fn frames_in(&self, samples: usize) -> u64 {
        if self.channels == 0 {
            return 0;
        }
        samples as u64 / self.channels as u64
    }

    /// Bytes used by one frame of 16-bit samples.
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * 2
    }
}

/// An opened PCM consumer bound to one [`PcmFormat`].
///
/// Implementations are owned by a single playback session and are only ever
/// touched from one thread at a time.
pub trait AudioSink: Send {
    /// Queue interleaved samples. Returns the number of samples accepted.
    fn write(&mut self, samples: &[i16]) -> Result<usize>;

    /// Start (or resume) rendering queued samples.
    fn play(&mut self) -> Result<()>;

    /// Discard queued samples that have not been rendered yet.
    fn flush(&mut self);

    /// Stop rendering. The sink is released after this call.
    fn stop(&mut self) -> Result<()>;
}

/// Factory for [`AudioSink`]s, typically wrapping the platform audio engine.
pub trait AudioOutput: Send + Sync {
    /// Open a sink configured for `format`.
    fn open(&self, format: PcmFormat) -> Result<Box<dyn AudioSink>>;
}

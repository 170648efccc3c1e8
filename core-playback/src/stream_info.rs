//! Stream parameters reported by the decoder once the header is parsed.

use bridge_traits::PcmFormat;
use core_runtime::TrackInfo;
use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};

/// Format and tags of the track currently being decoded.
///
/// Built once per parsed header and replaced wholesale when a chained stream
/// starts a new track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub vendor: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub date: String,
    pub track: String,
}

impl StreamInfo {
    /// Creates stream info with empty tags.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `sample_rate > 0` and `channels` is 1 or 2.
    pub fn new(sample_rate: u32, channels: u8) -> Result<Self> {
        if sample_rate == 0 {
            return Err(PlaybackError::InvalidArgument(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        if !(1..=2).contains(&channels) {
            return Err(PlaybackError::InvalidArgument(format!(
                "unsupported channel count {} (expected 1 or 2)",
                channels
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            vendor: String::new(),
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            date: String::new(),
            track: String::new(),
        })
    }

    pub fn with_tags(mut self, tags: TrackInfo) -> Self {
        self.vendor = tags.vendor;
        self.title = tags.title;
        self.artist = tags.artist;
        self.album = tags.album;
        self.date = tags.date;
        self.track = tags.track;
        self
    }

    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat::new(self.sample_rate, self.channels as u16)
    }

    pub fn track_info(&self) -> TrackInfo {
        TrackInfo {
            vendor: self.vendor.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            date: self.date.clone(),
            track: self.track.clone(),
        }
    }

    fn samples_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64
    }

    /// Interleaved samples (all channels) covering `ms` milliseconds.
    pub fn ms_to_samples(&self, ms: u64) -> u64 {
        ms * self.samples_per_second() / 1000
    }

    /// Bytes of 16-bit PCM covering `ms` milliseconds.
    pub fn ms_to_bytes(&self, ms: u64) -> u64 {
        self.ms_to_samples(ms) * 2
    }

    /// Milliseconds covered by `samples` interleaved samples.
    pub fn samples_to_ms(&self, samples: u64) -> u64 {
        1000 * samples / self.samples_per_second()
    }

    /// Milliseconds covered by `bytes` of 16-bit PCM.
    pub fn bytes_to_ms(&self, bytes: u64) -> u64 {
        self.samples_to_ms(bytes / 2)
    }
}

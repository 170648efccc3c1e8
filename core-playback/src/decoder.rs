//! # Decoder Seam
//!
//! The core never decodes audio itself. A [`DecoderSession`] owns one decode
//! loop for one source and drives it entirely through the [`DecodeFeed`]
//! callbacks: it pulls encoded bytes with `read_encoded`, reports the parsed
//! header with `on_start`, and pushes PCM with `write_pcm`.
//!
//! ```ignore
//! impl DecoderSession for MyOpusSession {
//!     fn run(&mut self, feed: &DecodeFeed) -> DecodeExit {
//!         feed.on_start_reading_header();
//!         let header = match self.parse_header(feed) {
//!             Some(header) => header,
//!             None => return DecodeExit::InvalidHeader,
//!         };
//!         if feed.on_start(header.rate, header.channels, header.tags).is_err() {
//!             return DecodeExit::InvalidHeader;
//!         }
//!         while let Some(pcm) = self.next_packet(feed) {
//!             feed.write_pcm(&pcm, None);
//!         }
//!         feed.exit_at(self.position())
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::Result;
use crate::feed::DecodeFeed;

/// Which decoder implementation a player asks its factory for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecoderKind {
    #[default]
    Opus,
    Vorbis,
    /// A host codec that reports source time with each PCM buffer and has no
    /// byte pull of its own; it uses [`DecodeFeed::wait_until_playable`].
    PlatformCodec,
}

impl DecoderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DecoderKind::Opus => "opus",
            DecoderKind::Vorbis => "vorbis",
            DecoderKind::PlatformCodec => "platform_codec",
        }
    }
}

impl fmt::Display for DecoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a decode loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeExit {
    /// The stream was decoded to its end, or the session was stopped.
    Success,
    /// The header could not be parsed.
    InvalidHeader,
    /// The loop gave up mid-stream.
    DecodeError,
}

impl DecodeExit {
    /// Classifies a loop that simply ran out of input.
    ///
    /// Ending more than `tolerance` before a known `duration` means the
    /// stream was cut short. Without a known duration every end counts as
    /// success.
    pub fn from_final_position(
        position: Duration,
        duration: Option<Duration>,
        tolerance: Duration,
    ) -> Self {
        match duration {
            Some(duration) if position + tolerance < duration => DecodeExit::DecodeError,
            _ => DecodeExit::Success,
        }
    }

    pub fn is_success(self) -> bool {
        self == DecodeExit::Success
    }

    pub(crate) fn failure_reason(self) -> Option<&'static str> {
        match self {
            DecodeExit::Success => None,
            DecodeExit::InvalidHeader => Some("invalid stream header"),
            DecodeExit::DecodeError => Some("decoding error"),
        }
    }
}

/// One decode loop over one source.
///
/// `run` is called exactly once, on the player's worker thread. It returns
/// when input is exhausted or when `read_encoded` returns 0 because the
/// session was stopped.
pub trait DecoderSession: Send {
    fn run(&mut self, feed: &DecodeFeed) -> DecodeExit;
}

/// Produces a fresh [`DecoderSession`] for every `set_source`.
pub trait DecoderFactory: Send + Sync {
    fn create(&self, kind: DecoderKind) -> Result<Box<dyn DecoderSession>>;
}

impl<F> DecoderFactory for F
where
    F: Fn(DecoderKind) -> Result<Box<dyn DecoderSession>> + Send + Sync,
{
    fn create(&self, kind: DecoderKind) -> Result<Box<dyn DecoderSession>> {
        self(kind)
    }
}

//! # Playback Core
//!
//! Coordinates an external decoder, a byte source and a PCM sink.
//!
//! ## Overview
//!
//! This crate handles:
//! - [`DataSource`]: sequential reads and byte seeking over a local file or an
//!   HTTP resource addressed with `Range` requests
//! - [`PlaybackState`] and the blocking pause gate shared by the control
//!   thread and the decode thread
//! - [`DecodeFeed`]: the callbacks a decode loop drives, with progress
//!   accounting derived from bytes consumed and frames written
//! - [`Player`]: session lifecycle, control calls and terminal events
//!
//! Decoding itself is out of scope: a [`DecoderSession`] supplied by the host
//! runs the codec and calls back into the feed.
//!
//! ## Threads
//!
//! ```text
//!   control thread                     decode thread
//!   ──────────────                     ─────────────
//!   set_source ── spawn ─────────────> DecoderSession::run(&feed)
//!   play/pause ── notify ──┐             read_encoded ──> DataSource
//!   stop ─────── notify ───┼─ Condvar ─> (parked while paused)
//!   set_position ── seek ──┘             write_pcm ─────> AudioSink
//!                                      on_stop; PlayingFinished/Failed
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod feed;
pub mod player;
pub mod progress;
pub mod source;
pub mod state;
pub mod stream_info;

pub use config::PlayerConfig;
pub use decoder::{DecodeExit, DecoderFactory, DecoderKind, DecoderSession};
pub use error::{PlaybackError, Result};
pub use feed::DecodeFeed;
pub use player::{Player, PlayerBuilder};
pub use progress::Progress;
pub use source::{DataSource, SourceKind};
pub use state::PlaybackState;
pub use stream_info::StreamInfo;

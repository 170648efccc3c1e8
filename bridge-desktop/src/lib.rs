//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`'s blocking client, used by remote data
//!   sources for ranged GETs and reconnect-on-seek
//!
//! Audio output is intentionally not provided here; hosts plug their own
//! `AudioOutput` into the player.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! // Hand `http_client` to `core_playback::Player::builder()`
//! ```

mod http;

pub use http::{ReqwestHttpClient, RetryPolicy};

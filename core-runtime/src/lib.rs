//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Player event bus and the `EventSink` seam
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that `core-playback` depends on.
//! It establishes the logging conventions and the ordered, broadcast-based
//! notification channel through which lifecycle and progress events reach
//! whoever owns a player.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{EventBus, EventSink, PlayerEvent, TrackInfo};

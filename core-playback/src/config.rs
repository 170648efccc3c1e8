//! # Player Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::decoder::DecoderKind;
use crate::source::DEFAULT_SEEK_FLOOR;

/// Player configuration.
///
/// Every field has a serde default, so a partial JSON document is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Lowest byte offset a seek may land on.
    ///
    /// Default: 500 bytes.
    #[serde(default = "default_seek_floor_bytes")]
    pub seek_floor_bytes: u64,

    /// How far before the known duration a decode loop may stop and still
    /// count as finished.
    ///
    /// Default: 1 second.
    #[serde(default = "default_completion_tolerance")]
    pub completion_tolerance: Duration,

    /// Timeout for remote I/O. It bounds connecting and each read of the
    /// body, not the body as a whole, so a long stream that keeps delivering
    /// never hits it. A stalled remote read gives up after this long.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout: Duration,

    /// Default: 10 seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Capacity of the default [`EventBus`](core_runtime::EventBus).
    ///
    /// Default: 256 events.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Name given to each session's decode thread.
    #[serde(default = "default_worker_thread_name")]
    pub worker_thread_name: String,

    #[serde(default)]
    pub decoder: DecoderKind,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            seek_floor_bytes: default_seek_floor_bytes(),
            completion_tolerance: default_completion_tolerance(),
            http_timeout: default_http_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            event_buffer_size: default_event_buffer_size(),
            worker_thread_name: default_worker_thread_name(),
            decoder: DecoderKind::default(),
        }
    }
}

impl PlayerConfig {
    /// Configuration for internet radio and other live streams.
    ///
    /// - Short read timeout: a station silent for 15 seconds is treated as
    ///   gone rather than left holding the decode thread
    /// - Quick connect timeout to fail fast on dead stations
    pub fn live_stream() -> Self {
        Self {
            http_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Configuration for a host codec that reports source time itself.
    pub fn platform_codec() -> Self {
        Self {
            decoder: DecoderKind::PlatformCodec,
            ..Default::default()
        }
    }

    pub fn with_decoder(mut self, decoder: DecoderKind) -> Self {
        self.decoder = decoder;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.http_timeout.is_zero() {
            return Err("http_timeout must be > 0".to_string());
        }

        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be > 0".to_string());
        }

        if self.connect_timeout > self.http_timeout {
            return Err("connect_timeout cannot exceed http_timeout".to_string());
        }

        if self.event_buffer_size == 0 {
            return Err("event_buffer_size must be > 0".to_string());
        }

        if self.worker_thread_name.trim().is_empty() {
            return Err("worker_thread_name must not be empty".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_seek_floor_bytes() -> u64 {
    DEFAULT_SEEK_FLOOR
}

fn default_completion_tolerance() -> Duration {
    Duration::from_secs(1)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("openplayer/{}", env!("CARGO_PKG_VERSION"))
}

fn default_event_buffer_size() -> usize {
    core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE
}

fn default_worker_thread_name() -> String {
    "decode-feed".to_string()
}

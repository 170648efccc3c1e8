//! # Playback Error Types
//!
//! Errors returned by control calls and by the decoder-facing callbacks.
//! Failures inside the decode loop never propagate as errors; they end the
//! session and are reported once through `PlayingFailed`.

use bridge_traits::BridgeError;
use thiserror::Error;

use crate::state::PlaybackState;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The locator could not be opened, or a remote reconnect failed.
    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),

    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// The decoder could not parse the stream header.
    #[error("Invalid stream header: {0}")]
    InvalidHeader(String),

    /// The decode loop ended well before the known duration.
    #[error("Decoding error: {0}")]
    DecodeError(String),

    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// A value passed in by the caller or the decoder was out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A control call arrived in a state that does not accept it.
    #[error("Operation '{operation}' not valid in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: PlaybackState,
    },

    /// Percent seeking on a stream without a known duration.
    #[error("Seeking not supported without a known duration")]
    SeekNotSupported,

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// The host audio sink could not be opened or started.
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the source could not be read.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::SourceUnavailable(_) | PlaybackError::Io(_) | PlaybackError::Bridge(_)
        )
    }

    /// Returns `true` if this error is related to the encoded stream itself.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidHeader(_) | PlaybackError::DecodeError(_)
        )
    }

    /// Returns `true` if the call was rejected without side effects on the
    /// stream, so the caller can correct it and try again.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidArgument(_)
                | PlaybackError::InvalidState { .. }
                | PlaybackError::SeekNotSupported
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

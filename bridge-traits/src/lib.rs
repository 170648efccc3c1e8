//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that is implemented differently per platform.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Blocking, range-addressable HTTP GET
//! - [`AudioOutput`](playback::AudioOutput) / [`AudioSink`](playback::AudioSink) - PCM output
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Provides |
//! |----------|---------------------|----------|
//! | Desktop  | `bridge-desktop`    | `HttpClient` |
//! | Mobile   | host application    | `AudioOutput`, `HttpClient` |
//!
//! Audio output is always host-supplied; the core ships no audio driver.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform-specific errors and keep the failing URL or device
//! name in the message.
//!
//! ## Thread Safety
//!
//! Factories (`HttpClient`, `AudioOutput`, `LoggerSink`) are `Send + Sync` and
//! shared between the control thread and the decode thread. Opened sinks are
//! `Send` and owned by one session.

pub mod error;
pub mod http;
pub mod logging;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{AudioOutput, AudioSink, PcmFormat};

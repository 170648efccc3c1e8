//! HTTP Client Abstraction
//!
//! Provides blocking, range-addressable HTTP GET for streaming sources. The
//! response body is handed out as a plain [`std::io::Read`] so the caller can
//! pull compressed bytes at its own pace from the decode thread.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Request everything from `offset` to the end of the resource.
    pub fn range_from(self, offset: u64) -> Self {
        self.header("Range", range_header_value(offset))
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Returns the start offset of an open-ended `Range` header, if present.
    pub fn range_start(&self) -> Option<u64> {
        self.headers
            .get("Range")
            .and_then(|value| value.strip_prefix("bytes="))
            .and_then(|spec| spec.strip_suffix('-'))
            .and_then(|start| start.parse().ok())
    }
}

/// Formats an open-ended byte range, e.g. `bytes=500-`.
pub fn range_header_value(offset: u64) -> String {
    format!("bytes={}-", offset)
}

/// HTTP response with a streaming body.
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Value of the `Content-Length` header. `None` for chunked or live responses.
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the server honored a range request (206)
    pub fn is_partial_content(&self) -> bool {
        self.status == 206
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Blocking HTTP client trait
///
/// Implementations are called from the decode thread and may block until the
/// response headers arrive. A stalled connection is bounded only by the
/// implementation's own timeouts.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// fn open_stream(client: &dyn HttpClient) -> Result<()> {
///     let response = client.execute(HttpRequest::get("https://radio.example/live.opus").range_from(0))?;
///     println!("length: {:?}", response.content_length);
///     Ok(())
/// }
/// ```
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return once the response headers are available.
    ///
    /// # Errors
    ///
    /// Returns error if the connection cannot be established or times out.
    /// Non-2xx statuses are returned as responses, not errors.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// GET `url` starting at byte `offset` with an open-ended range.
    fn fetch_from(&self, url: &str, offset: u64) -> Result<HttpResponse> {
        self.execute(HttpRequest::get(url).range_from(offset))
    }
}

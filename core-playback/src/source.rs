//! # Data Source
//!
//! Sequential reads with byte-offset seeking over either a local file or an
//! HTTP resource that honours `Range: bytes=<offset>-`.
//!
//! Remote seeking drops the current connection and reconnects at the new
//! offset. The source length is captured only from a request that starts at
//! offset 0; later range responses describe the remainder and are ignored.
//!
//! Read errors never propagate: the source logs them and behaves as if it hit
//! end of stream, which lets the decode loop wind down on its own.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use bridge_traits::{HttpClient, HttpResponse};
use core_runtime::logging::{redact_locator, strip_path};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};

/// Lowest byte offset a seek may land on. The first bytes of a stream carry
/// the codec header.
pub const DEFAULT_SEEK_FLOOR: u64 = 500;

/// Which backend a [`DataSource`] currently reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Local,
    Remote,
    /// No readable cursor is held.
    Invalid,
}

enum Cursor {
    Local(BufReader<File>),
    Remote(Box<dyn Read + Send>),
    Closed,
}

/// A readable, seekable byte stream for one playback session.
pub struct DataSource {
    locator: String,
    cursor: Cursor,
    /// Set when the cursor was opened remotely, kept so seeks can reconnect.
    http: Option<Arc<dyn HttpClient>>,
    length: Option<u64>,
    position: u64,
    seek_floor: u64,
    failed: bool,
}

impl DataSource {
    /// Opens `locator` as a local file, falling back to an HTTP request.
    ///
    /// Never fails outright: a locator that cannot be opened either way
    /// yields a source of kind [`SourceKind::Invalid`] with
    /// [`has_failed`](Self::has_failed) set.
    pub fn open(locator: &str, http: Arc<dyn HttpClient>, seek_floor: u64) -> Self {
        let mut source = Self {
            locator: locator.to_string(),
            cursor: Cursor::Closed,
            http: None,
            length: None,
            position: 0,
            seek_floor,
            failed: false,
        };

        match Self::open_local(locator) {
            Ok(Some((file, length))) => {
                info!(file = %strip_path(locator), length, "Opened local source");
                source.cursor = Cursor::Local(BufReader::new(file));
                source.length = Some(length);
                return source;
            }
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Local open failed, trying remote"),
        }

        source.http = Some(http);
        if let Err(e) = source.connect(0) {
            warn!(url = %redact_locator(locator), error = %e, "Could not open source");
            source.fail();
        }
        source
    }

    /// Returns the file and its length when `locator` names a non-empty
    /// regular file.
    fn open_local(locator: &str) -> io::Result<Option<(File, u64)>> {
        let path = Path::new(locator);
        if !path.is_file() {
            return Ok(None);
        }
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        if length == 0 {
            return Ok(None);
        }
        Ok(Some((file, length)))
    }

    /// Issues a ranged GET starting at `offset` and installs the response
    /// body as the cursor.
    fn connect(&mut self, offset: u64) -> Result<()> {
        let http = self
            .http
            .clone()
            .ok_or_else(|| PlaybackError::Internal("remote source without HTTP client".to_string()))?;

        let response = http.fetch_from(&self.locator, offset)?;
        if !response.is_success() {
            return Err(PlaybackError::SourceUnavailable(format!(
                "HTTP {} for {}",
                response.status,
                redact_locator(&self.locator)
            )));
        }

        if offset == 0 {
            self.length = response.content_length;
        }

        let body = Self::align_body(response, offset)?;
        debug!(
            url = %redact_locator(&self.locator),
            offset,
            length = ?self.length,
            "Connected remote source"
        );
        self.cursor = Cursor::Remote(body);
        self.position = offset;
        Ok(())
    }

    /// A server that ignores the range header answers 200 with the whole
    /// resource; skip up to the requested offset in that case.
    fn align_body(response: HttpResponse, offset: u64) -> Result<Box<dyn Read + Send>> {
        let partial = response.is_partial_content();
        let mut body = response.body;
        if offset > 0 && !partial {
            warn!(offset, "Server ignored range request, skipping forward");
            let skipped = io::copy(&mut body.by_ref().take(offset), &mut io::sink())?;
            if skipped < offset {
                return Err(PlaybackError::SourceUnavailable(format!(
                    "stream ended at {} before seek target {}",
                    skipped, offset
                )));
            }
        }
        Ok(body)
    }

    fn fail(&mut self) {
        self.cursor = Cursor::Closed;
        self.failed = true;
    }

    /// Reads up to `buf.len()` bytes. Returns 0 at end of stream, on a closed
    /// source, and after any read error.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        let result = match &mut self.cursor {
            Cursor::Local(reader) => reader.read(buf),
            Cursor::Remote(body) => body.read(buf),
            Cursor::Closed => return 0,
        };

        match result {
            Ok(n) => {
                self.position += n as u64;
                n
            }
            Err(e) => {
                warn!(
                    locator = %redact_locator(&self.locator),
                    position = self.position,
                    error = %e,
                    "Read failed, treating as end of stream"
                );
                self.cursor = Cursor::Closed;
                0
            }
        }
    }

    /// Moves the cursor to `offset`, raised to the seek floor. Returns the
    /// offset actually used.
    ///
    /// # Errors
    ///
    /// `SourceUnavailable` if the source is closed, or if a remote reconnect
    /// fails; in the latter case the source becomes invalid and failed.
    pub fn seek(&mut self, offset: u64) -> Result<u64> {
        let target = offset.max(self.seek_floor);

        if let Cursor::Local(reader) = &mut self.cursor {
            reader.seek(SeekFrom::Start(target))?;
            self.position = target;
            debug!(offset = target, "Seeked local source");
            return Ok(target);
        }

        if self.kind() == SourceKind::Invalid {
            return Err(PlaybackError::SourceUnavailable(format!(
                "cannot seek closed source {}",
                redact_locator(&self.locator)
            )));
        }

        // Drop the old connection before opening the new one.
        self.cursor = Cursor::Closed;
        match self.connect(target) {
            Ok(()) => Ok(target),
            Err(e) => {
                warn!(
                    url = %redact_locator(&self.locator),
                    offset = target,
                    error = %e,
                    "Reconnect for seek failed"
                );
                self.fail();
                Err(PlaybackError::SourceUnavailable(e.to_string()))
            }
        }
    }

    /// Releases the cursor. Safe to call repeatedly.
    pub fn close(&mut self) {
        if !matches!(self.cursor, Cursor::Closed) {
            debug!(locator = %redact_locator(&self.locator), "Closing source");
        }
        self.cursor = Cursor::Closed;
    }

    pub fn kind(&self) -> SourceKind {
        match self.cursor {
            Cursor::Local(_) => SourceKind::Local,
            Cursor::Remote(_) => SourceKind::Remote,
            Cursor::Closed => SourceKind::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.kind() != SourceKind::Invalid
    }

    /// `true` if the source became invalid because opening or reconnecting
    /// failed, as opposed to an orderly [`close`](Self::close).
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Total length in bytes; `None` for live or unknown-length streams.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Byte offset of the next read.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn seek_floor(&self) -> u64 {
        self.seek_floor
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("locator", &redact_locator(&self.locator))
            .field("kind", &self.kind())
            .field("length", &self.length)
            .field("position", &self.position)
            .field("failed", &self.failed)
            .finish()
    }
}

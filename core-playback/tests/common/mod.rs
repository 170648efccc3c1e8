//! Shared fixtures for core-playback integration tests.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioOutput, AudioSink, BridgeError, HttpClient, HttpRequest, HttpResponse, PcmFormat};
use core_playback::{
    DecodeExit, DecodeFeed, DecoderFactory, DecoderKind, DecoderSession, PlaybackError, Result,
};
use core_runtime::events::{Receiver, TryRecvError};
use core_runtime::{PlayerEvent, TrackInfo};
use mockall::mock;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

mock! {
    pub HttpClient {}

    impl HttpClient for HttpClient {
        fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        fn fetch_from(&self, url: &str, offset: u64) -> BridgeResult<HttpResponse>;
    }
}

mock! {
    pub AudioOutput {}

    impl AudioOutput for AudioOutput {
        fn open(&self, format: PcmFormat) -> BridgeResult<Box<dyn AudioSink>>;
    }
}

mock! {
    pub AudioSink {}

    impl AudioSink for AudioSink {
        fn write(&mut self, samples: &[i16]) -> BridgeResult<usize>;
        fn play(&mut self) -> BridgeResult<()>;
        fn flush(&mut self);
        fn stop(&mut self) -> BridgeResult<()>;
    }
}

/// Bytes `0, 1, .., 250, 0, 1, ..`; the value at offset `n` is `n % 251`.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn pattern_file(len: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&pattern(len)).unwrap();
    file.flush().unwrap();
    file
}

pub fn path_of(file: &tempfile::NamedTempFile) -> String {
    file.path().to_str().unwrap().to_string()
}

/// A 200/206 response carrying `body`.
pub fn response(status: u16, body: Vec<u8>, content_length: Option<u64>) -> HttpResponse {
    HttpResponse {
        status,
        headers: Default::default(),
        content_length,
        body: Box::new(std::io::Cursor::new(body)),
    }
}

pub struct NoNetwork;

/// Serves `body` honouring `Range: bytes=<offset>-` and records every
/// request it sees.
pub struct RangeServer {
    pub body: Vec<u8>,
    pub requests: Mutex<Vec<HttpRequest>>,
    /// Offsets whose request should fail.
    pub fail_offsets: Vec<u64>,
}

impl RangeServer {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            requests: Mutex::new(Vec::new()),
            fail_offsets: Vec::new(),
        }
    }

    pub fn range_headers(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .iter()
            .map(|request| request.headers.get("Range").cloned())
            .collect()
    }
}

impl HttpClient for RangeServer {
    fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let offset = request.range_start().unwrap_or(0);
        self.requests.lock().push(request);
        if self.fail_offsets.contains(&offset) {
            return Err(BridgeError::OperationFailed(format!("connection refused at {}", offset)));
        }
        let start = (offset as usize).min(self.body.len());
        let slice = self.body[start..].to_vec();
        let status = if offset > 0 { 206 } else { 200 };
        let length = slice.len() as u64;
        Ok(response(status, slice, Some(length)))
    }
}

impl HttpClient for NoNetwork {
    fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        Err(BridgeError::NotAvailable(request.url))
    }
}

/// Serves `head`, then blocks the next body read until released, as a live
/// stream gone quiet does. A one-shot server: later requests fail.
pub struct StallingServer {
    body: Mutex<Option<StallingBody>>,
}

impl StallingServer {
    /// Returns the server, a receiver signalled when a read blocks, and the
    /// sender that releases it. Dropping the sender releases it too.
    pub fn new(head: Vec<u8>) -> (Self, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let body = StallingBody {
            head: std::io::Cursor::new(head),
            entered: entered_tx,
            release: release_rx,
        };
        (Self { body: Mutex::new(Some(body)) }, entered_rx, release_tx)
    }
}

impl HttpClient for StallingServer {
    fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let body = self
            .body
            .lock()
            .take()
            .ok_or_else(|| BridgeError::OperationFailed(format!("{} already served", request.url)))?;
        Ok(HttpResponse {
            status: 200,
            headers: Default::default(),
            content_length: None,
            body: Box::new(body),
        })
    }
}

struct StallingBody {
    head: std::io::Cursor<Vec<u8>>,
    entered: mpsc::Sender<()>,
    release: mpsc::Receiver<()>,
}

impl Read for StallingBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.head.read(buf)?;
        if n > 0 {
            return Ok(n);
        }
        let _ = self.entered.send(());
        let _ = self.release.recv_timeout(EVENT_TIMEOUT);
        Ok(0)
    }
}

// ============================================================================
// Recording audio output
// ============================================================================

#[derive(Debug, Default)]
pub struct SinkLog {
    pub opened: Vec<PcmFormat>,
    pub samples_written: usize,
    pub flushes: usize,
    pub stops: usize,
}

struct RecordingSink(Arc<Mutex<SinkLog>>);

impl AudioSink for RecordingSink {
    fn write(&mut self, samples: &[i16]) -> BridgeResult<usize> {
        self.0.lock().samples_written += samples.len();
        Ok(samples.len())
    }

    fn play(&mut self) -> BridgeResult<()> {
        Ok(())
    }

    fn flush(&mut self) {
        self.0.lock().flushes += 1;
    }

    fn stop(&mut self) -> BridgeResult<()> {
        self.0.lock().stops += 1;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct RecordingOutput {
    pub log: Arc<Mutex<SinkLog>>,
}

impl AudioOutput for RecordingOutput {
    fn open(&self, format: PcmFormat) -> BridgeResult<Box<dyn AudioSink>> {
        self.log.lock().opened.push(format);
        Ok(Box::new(RecordingSink(Arc::clone(&self.log))))
    }
}

// ============================================================================
// Scripted decoder
// ============================================================================

/// A pass-through "decoder": every `read_size` encoded bytes become
/// `samples_per_read` PCM samples.
pub struct ScriptedDecoder {
    pub sample_rate: u32,
    pub channels: u8,
    pub read_size: usize,
    pub samples_per_read: usize,
    pub tags: TrackInfo,
    /// Waited on after `on_start_reading_header`, before `on_start`.
    pub header_gate: Option<mpsc::Receiver<()>>,
    /// Waited on before every read.
    pub ticks: Option<mpsc::Receiver<()>>,
    /// Every encoded byte handed to the decoder, in order.
    pub consumed: Arc<Mutex<Vec<u8>>>,
    /// Return this instead of reading anything.
    pub exit_early: Option<DecodeExit>,
    /// Stop pulling after this many reads.
    pub max_reads: Option<usize>,
}

impl ScriptedDecoder {
    pub fn new(sample_rate: u32, channels: u8, read_size: usize, samples_per_read: usize) -> Self {
        Self {
            sample_rate,
            channels,
            read_size,
            samples_per_read,
            tags: TrackInfo {
                vendor: "scripted".into(),
                title: "Test Tone".into(),
                artist: "Fixture".into(),
                album: String::new(),
                date: String::new(),
                track: "1".into(),
            },
            header_gate: None,
            ticks: None,
            consumed: Arc::new(Mutex::new(Vec::new())),
            exit_early: None,
            max_reads: None,
        }
    }

    /// Gates every read on a tick; returns the sender.
    pub fn with_ticks(mut self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.ticks = Some(rx);
        (self, tx)
    }

    pub fn with_header_gate(mut self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.header_gate = Some(rx);
        (self, tx)
    }
}

impl DecoderSession for ScriptedDecoder {
    fn run(&mut self, feed: &DecodeFeed) -> DecodeExit {
        feed.on_start_reading_header();
        if let Some(exit) = self.exit_early {
            return exit;
        }
        if let Some(gate) = &self.header_gate {
            if gate.recv().is_err() {
                return DecodeExit::InvalidHeader;
            }
        }
        if feed
            .on_start(self.sample_rate, self.channels, self.tags.clone())
            .is_err()
        {
            return DecodeExit::InvalidHeader;
        }

        let mut buf = vec![0u8; self.read_size];
        let pcm = vec![0i16; self.samples_per_read];
        let mut reads = 0usize;
        loop {
            if self.max_reads.is_some_and(|max| reads >= max) {
                break;
            }
            if let Some(ticks) = &self.ticks {
                if ticks.recv().is_err() {
                    break;
                }
            }
            let n = fill(feed, &mut buf);
            if n == 0 {
                break;
            }
            reads += 1;
            self.consumed.lock().extend_from_slice(&buf[..n]);
            feed.write_pcm(&pcm, None);
        }

        let frames_per_read = (self.samples_per_read / self.channels as usize) as u64;
        let position =
            Duration::from_millis(reads as u64 * frames_per_read * 1000 / self.sample_rate as u64);
        feed.exit_at(position)
    }
}

/// Pulls until `buf` is full or the feed runs dry, like a decoder that
/// needs whole packets.
fn fill(feed: &DecodeFeed, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        let n = feed.read_encoded(&mut buf[filled..]);
        if n == 0 {
            break;
        }
        filled += n;
    }
    filled
}

/// Hands out decoders in the order they were pushed; the factory errors
/// once the queue is empty.
///
/// Push decoders after building the player so that their gate senders are
/// dropped first and the player's drop can join the decode thread.
#[derive(Clone, Default)]
pub struct DecoderQueue(Arc<Mutex<VecDeque<ScriptedDecoder>>>);

impl DecoderQueue {
    pub fn push(&self, decoder: ScriptedDecoder) {
        self.0.lock().push_back(decoder);
    }

    pub fn factory(&self) -> Arc<dyn DecoderFactory> {
        let queue = Arc::clone(&self.0);
        Arc::new(move |kind: DecoderKind| -> Result<Box<dyn DecoderSession>> {
            match queue.lock().pop_front() {
                Some(decoder) => Ok(Box::new(decoder)),
                None => Err(PlaybackError::Internal(format!("no {} decoder left", kind))),
            }
        })
    }
}

// ============================================================================
// Event helpers
// ============================================================================

/// Next event, failing the test after [`EVENT_TIMEOUT`].
pub fn next_event(rx: &mut Receiver<PlayerEvent>) -> PlayerEvent {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    loop {
        match rx.try_recv() {
            Ok(event) => return event,
            Err(TryRecvError::Empty) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(2))
            }
            Err(e) => panic!("no event: {:?}", e),
        }
    }
}

/// Skips events until one matches `predicate`; returns everything skipped
/// plus the match.
pub fn events_until<F>(rx: &mut Receiver<PlayerEvent>, predicate: F) -> Vec<PlayerEvent>
where
    F: Fn(&PlayerEvent) -> bool,
{
    let mut seen = Vec::new();
    loop {
        let event = next_event(rx);
        let done = predicate(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

pub fn assert_no_event(rx: &mut Receiver<PlayerEvent>, within: Duration) {
    thread::sleep(within);
    match rx.try_recv() {
        Err(TryRecvError::Empty) => {}
        other => panic!("unexpected event: {:?}", other),
    }
}

/// Polls `condition` until it holds or [`EVENT_TIMEOUT`] passes.
pub fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

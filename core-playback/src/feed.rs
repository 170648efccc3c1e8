//! # Decode Feed
//!
//! The callback surface a decode loop drives. One feed exists per session and
//! is bound to that session's number; once the session is stopped or
//! replaced, every callback on the feed behaves as if the player were
//! `Stopped`.
//!
//! ## Locking
//!
//! The feed holds four locks: the shared state cell, the source, the sink and
//! the stream info. The first three are never held at the same time, so a
//! control call can always make progress while the decode thread is blocked
//! in a read or a write. Stream info is only ever taken while the state cell
//! is held or on its own.
//!
//! Events are published while the state cell is held, which keeps their
//! delivery order identical to the order of the transitions they describe.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{AudioOutput, AudioSink};
use core_runtime::{EventSink, PlayerEvent, TrackInfo};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::decoder::DecodeExit;
use crate::error::{PlaybackError, Result};
use crate::progress::{Calibration, Progress};
use crate::source::DataSource;
use crate::state::{PlaybackState, SharedState};
use crate::stream_info::StreamInfo;

/// Callbacks for one decode session.
pub struct DecodeFeed {
    shared: Arc<SharedState>,
    session: u64,
    source: Mutex<DataSource>,
    sink: Mutex<Option<Box<dyn AudioSink>>>,
    output: Arc<dyn AudioOutput>,
    events: Arc<dyn EventSink>,
    duration: Option<Duration>,
    calibration: Option<Calibration>,
    /// Source length at open; seeks never change it.
    length: Option<u64>,
    completion_tolerance: Duration,
    stream_info: Mutex<Option<StreamInfo>>,
}

impl DecodeFeed {
    pub(crate) fn new(
        shared: Arc<SharedState>,
        session: u64,
        source: DataSource,
        output: Arc<dyn AudioOutput>,
        events: Arc<dyn EventSink>,
        duration: Option<Duration>,
    ) -> Self {
        let length = source.length();
        let calibration = Calibration::new(duration, length);
        Self {
            shared,
            session,
            source: Mutex::new(source),
            sink: Mutex::new(None),
            output,
            events,
            duration,
            calibration,
            length,
            completion_tolerance: Duration::from_secs(1),
            stream_info: Mutex::new(None),
        }
    }

    pub(crate) fn with_completion_tolerance(mut self, tolerance: Duration) -> Self {
        self.completion_tolerance = tolerance;
        self
    }

    // ========================================================================
    // Decoder callbacks
    // ========================================================================

    /// Marks the start of header parsing. Only leaves `Stopped`; any other
    /// state is left alone.
    pub fn on_start_reading_header(&self) {
        let mut cell = self.shared.lock();
        if !cell.is_live(self.session) {
            return;
        }
        if cell.state.is_stopped() && cell.transition(PlaybackState::ReadingHeader) {
            self.events.publish(PlayerEvent::ReadingHeader);
        }
    }

    /// Fills `buf` with encoded bytes and returns how many were written.
    ///
    /// Blocks while the session is paused. Returns 0 once the session is
    /// stopped, at end of stream, and on any source failure.
    pub fn read_encoded(&self, buf: &mut [u8]) -> usize {
        if !self.pass_pause_gate() {
            return 0;
        }

        let read = self.source.lock().read(buf);

        let mut cell = self.shared.lock();
        if !cell.is_live(self.session) {
            // Stopped mid-read; on_stop left the close to this thread.
            drop(cell);
            self.close_source();
            return 0;
        }
        cell.progress.record_read(read);
        read
    }

    /// Reports a parsed header: opens the sink at the new format and, for the
    /// first header of a session, moves to `ReadyToPlay`.
    ///
    /// Ignored unless the session is reading the header or playing (a
    /// chained stream starting its next track).
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `sample_rate` is 0 or `channels` is not 1 or 2.
    ///   This is a decoder bug and additionally trips a debug assertion.
    /// - `AudioDevice` if the sink cannot be opened or started.
    #[instrument(skip(self, tags), fields(session = self.session))]
    pub fn on_start(&self, sample_rate: u32, channels: u8, tags: TrackInfo) -> Result<()> {
        let state = self.shared.lock().state_for(self.session);
        if !matches!(state, PlaybackState::ReadingHeader | PlaybackState::Playing) {
            warn!(%state, "Ignoring stream start outside header read or playback");
            return Ok(());
        }

        let info = match StreamInfo::new(sample_rate, channels) {
            Ok(info) => info.with_tags(tags),
            Err(e) => {
                error!(sample_rate, channels, "Decoder reported an invalid stream format");
                debug_assert!(false, "invalid stream format: {}", e);
                return Err(e);
            }
        };

        let sink = self.open_sink(&info)?;
        if let Some(previous) = self.sink.lock().replace(sink) {
            Self::shut_down_sink(previous);
        }

        let mut cell = self.shared.lock();
        if !cell.is_live(self.session) {
            drop(cell);
            debug!("Session stopped while the sink was opening");
            self.release_sink();
            return Ok(());
        }

        info!(
            sample_rate,
            channels,
            title = %info.title,
            artist = %info.artist,
            "Stream started"
        );
        let track = info.track_info();
        *self.stream_info.lock() = Some(info);

        if cell.state == PlaybackState::ReadingHeader {
            cell.transition(PlaybackState::ReadyToPlay);
            self.events.publish(PlayerEvent::ReadyToPlay);
        }
        self.events.publish(PlayerEvent::TrackInfo(track));
        Ok(())
    }

    /// Pushes decoded, interleaved PCM to the sink.
    ///
    /// Blocks while the session is paused. Output is dropped unless the
    /// session is playing. `source_time` is the decoder's own position in the
    /// stream, when it knows it; it takes precedence over derived time.
    pub fn write_pcm(&self, samples: &[i16], source_time: Option<Duration>) {
        let Some(format) = self.stream_info.lock().as_ref().map(StreamInfo::pcm_format) else {
            debug!("Dropping PCM written before the stream started");
            return;
        };

        if !self.pass_pause_gate() {
            return;
        }
        if self.shared.lock().state_for(self.session) != PlaybackState::Playing {
            return;
        }

        let written = match self.sink.lock().as_mut() {
            Some(sink) => sink.write(samples),
            None => return,
        };
        if let Err(e) = written {
            warn!(error = %e, samples = samples.len(), "Audio sink rejected PCM");
            return;
        }

        let frames = format.frames_in(samples.len());
        let mut cell = self.shared.lock();
        if !cell.is_live(self.session) {
            return;
        }
        cell.progress
            .record_write(frames, format.sample_rate, source_time, self.calibration);
        self.events.publish(PlayerEvent::PlayUpdate {
            seconds: cell.progress.elapsed_seconds(),
        });
    }

    /// Ends the session: zeroes the counters, closes the source, releases the
    /// sink and wakes anything parked on the pause gate.
    ///
    /// Never waits on a read in progress; in that case the source is closed
    /// by the decode thread when the read returns.
    ///
    /// Safe to call any number of times, from either thread. A stale feed
    /// only releases its own source and sink.
    #[instrument(skip(self), fields(session = self.session))]
    pub fn on_stop(&self) {
        {
            let mut cell = self.shared.lock();
            if cell.is_live(self.session) {
                cell.end_session();
                info!("Session stopped");
            }
        }
        self.shared.notify_all();

        // The decode thread may be blocked in a read holding the source; it
        // closes the source itself once the read returns.
        match self.source.try_lock() {
            Some(mut source) => source.close(),
            None => debug!("Source busy in a read, leaving close to the decode thread"),
        }
        self.release_sink();
    }

    /// Pause gate for decoders with no byte pull of their own.
    ///
    /// Blocks while paused; returns `false` once the session has stopped.
    pub fn wait_until_playable(&self) -> bool {
        self.pass_pause_gate()
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Seeks to `percent` of the stream.
    ///
    /// # Errors
    ///
    /// - `InvalidState` once the session has stopped
    /// - `SeekNotSupported` without a known duration or source length
    /// - `InvalidArgument` for `percent > 100`
    /// - `SourceUnavailable` if a remote reconnect fails
    #[instrument(skip(self), fields(session = self.session))]
    pub fn set_position(&self, percent: u8) -> Result<()> {
        let state = self.shared.lock().state_for(self.session);
        if state.is_stopped() {
            return Err(PlaybackError::InvalidState {
                operation: "set_position",
                state,
            });
        }

        let duration = self.duration.ok_or(PlaybackError::SeekNotSupported)?;
        if percent > 100 {
            return Err(PlaybackError::InvalidArgument(format!(
                "seek percent {} exceeds 100",
                percent
            )));
        }
        let length = self.length.ok_or(PlaybackError::SeekNotSupported)?;

        let target = (length as u128 * percent as u128 / 100) as u64;
        let elapsed_ms = (duration.as_millis() * percent as u128 / 100) as u64;

        if let Some(sink) = self.sink.lock().as_mut() {
            sink.flush();
        }
        let offset = self.source.lock().seek(target)?;

        let mut cell = self.shared.lock();
        if cell.is_live(self.session) {
            cell.progress.seek_to(offset, elapsed_ms);
        }
        info!(percent, target, offset, elapsed_ms, "Seeked");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Elapsed playback time in whole seconds; 0 once stopped.
    pub fn current_position(&self) -> u64 {
        let cell = self.shared.lock();
        if cell.is_live(self.session) {
            cell.progress.elapsed_seconds()
        } else {
            0
        }
    }

    /// Snapshot of the progress counters; zeroed once stopped.
    pub fn progress(&self) -> Progress {
        let cell = self.shared.lock();
        if cell.is_live(self.session) {
            cell.progress
        } else {
            Progress::default()
        }
    }

    /// State of this feed's session.
    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state_for(self.session)
    }

    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.stream_info.lock().clone()
    }

    /// Duration supplied with the source, if any.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn data_source_valid(&self) -> bool {
        self.source.lock().is_valid()
    }

    /// Whether the source failed to open or to reconnect.
    pub fn source_failed(&self) -> bool {
        self.source.lock().has_failed()
    }

    /// Total length of the source in bytes, when known.
    pub fn source_length(&self) -> Option<u64> {
        self.length
    }

    /// Duration extrapolated from progress, for sources opened without one.
    pub fn estimated_duration(&self) -> Option<Duration> {
        if self.duration.is_some() {
            return self.duration;
        }
        let length = self.source_length()?;
        self.progress().estimated_duration(length)
    }

    /// Classifies a decode loop that ran out of input at `position`,
    /// using the session's duration and the configured tolerance.
    pub fn exit_at(&self, position: Duration) -> DecodeExit {
        DecodeExit::from_final_position(position, self.duration, self.completion_tolerance)
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) fn publish(&self, event: PlayerEvent) {
        self.events.publish(event);
    }

    /// `true` once a later session has replaced this one.
    pub(crate) fn is_superseded(&self) -> bool {
        self.shared.lock().session != self.session
    }

    /// Parks while paused. Returns whether the session is still running.
    fn pass_pause_gate(&self) -> bool {
        let live_stream = self.duration.is_none();
        let mut cell = self.shared.lock();
        if !cell.is_live(self.session) {
            return false;
        }
        self.shared.wait_while_paused(&mut cell, self.session, |cell| {
            // A paused live stream rejoins at the live edge, not where it left off.
            if live_stream {
                cell.progress.elapsed_ms = 0;
            }
        });
        cell.is_live(self.session)
    }

    fn open_sink(&self, info: &StreamInfo) -> Result<Box<dyn AudioSink>> {
        let mut sink = self
            .output
            .open(info.pcm_format())
            .map_err(|e| PlaybackError::AudioDevice(e.to_string()))?;
        sink.play()
            .map_err(|e| PlaybackError::AudioDevice(e.to_string()))?;
        Ok(sink)
    }

    /// Closes the source, waiting out any read in progress.
    pub(crate) fn close_source(&self) {
        self.source.lock().close();
    }

    fn release_sink(&self) {
        let sink = self.sink.lock().take();
        if let Some(sink) = sink {
            Self::shut_down_sink(sink);
        }
    }

    fn shut_down_sink(mut sink: Box<dyn AudioSink>) {
        sink.flush();
        if let Err(e) = sink.stop() {
            warn!(error = %e, "Audio sink failed to stop");
        }
    }
}

impl fmt::Debug for DecodeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeFeed")
            .field("session", &self.session)
            .field("duration", &self.duration)
            .field("source", &*self.source.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, HttpClient, HttpRequest, HttpResponse, PcmFormat};
    use core_runtime::EventBus;
    use std::io::Write;
    use std::thread;

    struct NoNetwork;

    impl HttpClient for NoNetwork {
        fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable(request.url))
        }
    }

    #[derive(Default)]
    struct SinkLog {
        opened: Vec<PcmFormat>,
        written: usize,
        flushes: usize,
        stops: usize,
    }

    struct LoggingSink(Arc<Mutex<SinkLog>>);

    impl AudioSink for LoggingSink {
        fn write(&mut self, samples: &[i16]) -> BridgeResult<usize> {
            self.0.lock().written += samples.len();
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

    #[derive(Default)]
    struct LoggingOutput(Arc<Mutex<SinkLog>>);

    impl AudioOutput for LoggingOutput {
        fn open(&self, format: PcmFormat) -> BridgeResult<Box<dyn AudioSink>> {
            self.0.lock().opened.push(format);
            Ok(Box::new(LoggingSink(Arc::clone(&self.0))))
        }
    }

    struct Fixture {
        _file: tempfile::NamedTempFile,
        shared: Arc<SharedState>,
        feed: Arc<DecodeFeed>,
        sink: Arc<Mutex<SinkLog>>,
        bus: EventBus,
    }

    fn fixture(len: usize, duration: Option<Duration>) -> Fixture {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![7u8; len]).unwrap();
        file.flush().unwrap();

        let shared = Arc::new(SharedState::new());
        let session = shared.lock().begin_session();
        let source = DataSource::open(file.path().to_str().unwrap(), Arc::new(NoNetwork), 500);
        let output = LoggingOutput::default();
        let sink = Arc::clone(&output.0);
        let bus = EventBus::new(64);

        let feed = Arc::new(DecodeFeed::new(
            Arc::clone(&shared),
            session,
            source,
            Arc::new(output),
            Arc::new(bus.clone()),
            duration,
        ));
        Fixture {
            _file: file,
            shared,
            feed,
            sink,
            bus,
        }
    }

    fn start_playing(fx: &Fixture) {
        fx.feed.on_start_reading_header();
        fx.feed.on_start(16_000, 1, TrackInfo::default()).unwrap();
        fx.shared.lock().transition(PlaybackState::Playing);
    }

    #[test]
    fn test_header_sequence_emits_events_in_order() {
        let fx = fixture(1000, None);
        let mut rx = fx.bus.subscribe();

        fx.feed.on_start_reading_header();
        let tags = TrackInfo {
            title: "A".into(),
            ..Default::default()
        };
        fx.feed.on_start(48_000, 2, tags.clone()).unwrap();

        assert_eq!(fx.feed.state(), PlaybackState::ReadyToPlay);
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::ReadingHeader);
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::ReadyToPlay);
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::TrackInfo(tags));
        assert_eq!(fx.sink.lock().opened, vec![PcmFormat::new(48_000, 2)]);
    }

    #[test]
    fn test_on_start_ignored_when_paused_or_stopped() {
        let fx = fixture(1000, None);
        fx.feed.on_start(48_000, 2, TrackInfo::default()).unwrap();
        assert!(fx.feed.stream_info().is_none());
        assert!(fx.sink.lock().opened.is_empty());
    }

    #[test]
    fn test_mid_session_track_change_reopens_sink() {
        let fx = fixture(1000, None);
        start_playing(&fx);
        let mut rx = fx.bus.subscribe();

        fx.feed.on_start(44_100, 2, TrackInfo::default()).unwrap();

        assert_eq!(fx.feed.state(), PlaybackState::Playing);
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::TrackInfo(TrackInfo::default()));
        assert!(rx.try_recv().is_err());
        let log = fx.sink.lock();
        assert_eq!(log.opened.len(), 2);
        assert_eq!(log.stops, 1);
        drop(log);
        assert_eq!(fx.feed.stream_info().unwrap().sample_rate, 44_100);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "invalid stream format"))]
    fn test_on_start_rejects_bad_channel_count() {
        let fx = fixture(1000, None);
        fx.feed.on_start_reading_header();
        let result = fx.feed.on_start(48_000, 3, TrackInfo::default());
        assert!(matches!(result, Err(PlaybackError::InvalidArgument(_))));
        assert_eq!(fx.feed.state(), PlaybackState::ReadingHeader);
    }

    #[test]
    fn test_on_start_after_stop_ignores_bad_format() {
        let fx = fixture(1000, None);
        fx.feed.on_start_reading_header();
        fx.feed.on_stop();

        let result = fx.feed.on_start(0, 7, TrackInfo::default());
        assert!(result.is_ok());
        assert!(fx.feed.stream_info().is_none());
        assert_eq!(fx.feed.state(), PlaybackState::Stopped);
        assert!(fx.sink.lock().opened.is_empty());
    }

    #[test]
    fn test_read_encoded_counts_bytes() {
        let fx = fixture(1000, None);
        fx.feed.on_start_reading_header();

        let mut buf = [0u8; 300];
        assert_eq!(fx.feed.read_encoded(&mut buf), 300);
        assert_eq!(fx.feed.progress().bytes_consumed, 300);
    }

    #[test]
    fn test_read_encoded_blocks_while_paused() {
        let fx = fixture(1000, None);
        fx.feed.on_start_reading_header();
        fx.feed.on_start(16_000, 1, TrackInfo::default()).unwrap();

        let reader = {
            let feed = Arc::clone(&fx.feed);
            thread::spawn(move || {
                let mut buf = [0u8; 100];
                feed.read_encoded(&mut buf)
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!reader.is_finished());

        fx.shared.lock().transition(PlaybackState::Playing);
        fx.shared.notify_all();
        assert_eq!(reader.join().unwrap(), 100);
    }

    #[test]
    fn test_stop_releases_paused_reader_with_zero() {
        let fx = fixture(1000, None);
        fx.feed.on_start_reading_header();
        fx.feed.on_start(16_000, 1, TrackInfo::default()).unwrap();

        let reader = {
            let feed = Arc::clone(&fx.feed);
            thread::spawn(move || {
                let mut buf = [0u8; 100];
                feed.read_encoded(&mut buf)
            })
        };

        thread::sleep(Duration::from_millis(20));
        fx.feed.on_stop();
        assert_eq!(reader.join().unwrap(), 0);
    }

    #[test]
    fn test_write_pcm_accumulates_frames_without_calibration() {
        let fx = fixture(1000, None);
        start_playing(&fx);
        let mut rx = fx.bus.subscribe();

        fx.feed.write_pcm(&vec![0i16; 16_000], None);
        fx.feed.write_pcm(&vec![0i16; 8_000], None);

        let progress = fx.feed.progress();
        assert_eq!(progress.pcm_frames_written, 24_000);
        assert_eq!(progress.elapsed_ms, 1_500);
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::PlayUpdate { seconds: 1 });
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::PlayUpdate { seconds: 1 });
        assert_eq!(fx.sink.lock().written, 24_000);
    }

    #[test]
    fn test_write_pcm_uses_source_time_hint() {
        let fx = fixture(1000, Some(Duration::from_secs(10)));
        start_playing(&fx);

        fx.feed.write_pcm(&[0i16; 160], Some(Duration::from_millis(4_200)));
        assert_eq!(fx.feed.progress().elapsed_ms, 4_200);
        assert_eq!(fx.feed.current_position(), 4);
    }

    #[test]
    fn test_write_pcm_dropped_unless_playing() {
        let fx = fixture(1000, None);
        fx.feed.on_start_reading_header();
        fx.feed.on_start(16_000, 1, TrackInfo::default()).unwrap();
        fx.feed.on_stop();

        fx.feed.write_pcm(&[0i16; 160], None);
        assert_eq!(fx.sink.lock().written, 0);
    }

    #[test]
    fn test_exit_at_applies_tolerance() {
        let fx = fixture(1000, Some(Duration::from_secs(10)));
        assert_eq!(fx.feed.exit_at(Duration::from_millis(9_500)), DecodeExit::Success);
        assert_eq!(fx.feed.exit_at(Duration::from_secs(8)), DecodeExit::DecodeError);

        let fx = fixture(1000, None);
        assert_eq!(fx.feed.exit_at(Duration::ZERO), DecodeExit::Success);
    }

    #[test]
    fn test_set_position_requires_duration() {
        let fx = fixture(10_000, None);
        start_playing(&fx);
        assert!(matches!(
            fx.feed.set_position(50),
            Err(PlaybackError::SeekNotSupported)
        ));
    }

    #[test]
    fn test_set_position_rejects_percent_over_100() {
        let fx = fixture(10_000, Some(Duration::from_secs(10)));
        start_playing(&fx);
        assert!(matches!(
            fx.feed.set_position(101),
            Err(PlaybackError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_set_position_moves_counters_and_flushes() {
        let fx = fixture(4_000_000, Some(Duration::from_secs(200)));
        start_playing(&fx);

        fx.feed.set_position(50).unwrap();

        let progress = fx.feed.progress();
        assert_eq!(progress.elapsed_ms, 100_000);
        assert_eq!(progress.bytes_consumed, 2_000_000);
        assert_eq!(fx.sink.lock().flushes, 1);
    }

    #[test]
    fn test_set_position_zero_lands_on_seek_floor() {
        let fx = fixture(10_000, Some(Duration::from_secs(10)));
        start_playing(&fx);

        fx.feed.set_position(0).unwrap();
        assert_eq!(fx.feed.progress().bytes_consumed, 500);
        assert_eq!(fx.feed.progress().elapsed_ms, 0);
    }

    #[test]
    fn test_on_stop_is_idempotent_and_releases_everything() {
        let fx = fixture(1000, None);
        start_playing(&fx);
        fx.feed.write_pcm(&[0i16; 160], None);

        fx.feed.on_stop();
        fx.feed.on_stop();

        assert_eq!(fx.feed.state(), PlaybackState::Stopped);
        assert_eq!(fx.feed.progress(), Progress::default());
        assert!(!fx.feed.data_source_valid());
        assert!(!fx.feed.source_failed());
        assert_eq!(fx.sink.lock().stops, 1);
        assert!(matches!(
            fx.feed.set_position(10),
            Err(PlaybackError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_stale_feed_cannot_touch_new_session() {
        let fx = fixture(1000, None);
        start_playing(&fx);

        // A new session replaces this one.
        let next = fx.shared.lock().begin_session();
        fx.shared.lock().transition(PlaybackState::ReadingHeader);

        let mut buf = [0u8; 10];
        assert_eq!(fx.feed.read_encoded(&mut buf), 0);
        fx.feed.on_start_reading_header();
        fx.feed.on_stop();

        let cell = fx.shared.lock();
        assert_eq!(cell.session, next);
        assert_eq!(cell.state, PlaybackState::ReadingHeader);
        assert!(cell.is_live(next));
        drop(cell);
        assert!(fx.feed.is_superseded());
    }

    #[test]
    fn test_live_stream_pause_resets_elapsed() {
        let fx = fixture(1000, None);
        start_playing(&fx);
        fx.feed.write_pcm(&vec![0i16; 32_000], None);
        assert_eq!(fx.feed.progress().elapsed_ms, 2_000);

        fx.shared.lock().transition(PlaybackState::ReadyToPlay);
        let reader = {
            let feed = Arc::clone(&fx.feed);
            thread::spawn(move || {
                let mut buf = [0u8; 10];
                feed.read_encoded(&mut buf)
            })
        };
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fx.feed.progress().elapsed_ms, 0);

        fx.shared.lock().transition(PlaybackState::Playing);
        fx.shared.notify_all();
        assert_eq!(reader.join().unwrap(), 10);
    }

    #[test]
    fn test_wait_until_playable() {
        let fx = fixture(1000, None);
        start_playing(&fx);
        assert!(fx.feed.wait_until_playable());
        fx.feed.on_stop();
        assert!(!fx.feed.wait_until_playable());
    }
}

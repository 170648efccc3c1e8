//! # Player
//!
//! Owns the playback state and one session at a time. `set_source` opens the
//! source on the calling thread, then hands a [`DecodeFeed`] to a dedicated
//! decode thread that runs the configured [`DecoderSession`]. Control calls
//! may come from any thread.
//!
//! ## Session exit
//!
//! When `run` returns, the worker always stops the session, then publishes
//! exactly one terminal event:
//!
//! | condition                         | event             |
//! |-----------------------------------|-------------------|
//! | source failed to open or reconnect | `PlayingFailed`  |
//! | `DecodeExit::Success`             | `PlayingFinished` |
//! | `InvalidHeader` / `DecodeError`   | `PlayingFailed`   |
//!
//! A session already replaced by a newer one publishes nothing.
//!
//! ## Usage
//!
//! ```ignore
//! let player = Player::builder()
//!     .audio_output(Arc::new(host_output))
//!     .decoder_factory(Arc::new(|_kind: DecoderKind| -> Result<Box<dyn DecoderSession>> {
//!         Ok(Box::new(MyDecoder::new()))
//!     }))
//!     .build()?;
//! let mut events = player.subscribe().expect("default bus");
//!
//! player.set_source("https://example.com/stream.opus", Some(Duration::from_secs(200)))?;
//! // wait for PlayerEvent::ReadyToPlay ...
//! player.play()?;
//! player.set_position(50)?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bridge_traits::{AudioOutput, HttpClient};
use core_runtime::events::Receiver;
use core_runtime::logging::redact_locator;
use core_runtime::{EventBus, EventSink, PlayerEvent};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::config::PlayerConfig;
use crate::decoder::{DecodeExit, DecoderFactory, DecoderKind, DecoderSession};
use crate::error::{PlaybackError, Result};
use crate::feed::DecodeFeed;
use crate::source::DataSource;
use crate::state::{PlaybackState, SharedState};
use crate::stream_info::StreamInfo;

struct ActiveSession {
    feed: Arc<DecodeFeed>,
    worker: JoinHandle<()>,
}

/// Playback controller for one source at a time.
pub struct Player {
    shared: Arc<SharedState>,
    config: PlayerConfig,
    output: Arc<dyn AudioOutput>,
    http: Arc<dyn HttpClient>,
    events: Arc<dyn EventSink>,
    bus: Option<EventBus>,
    decoders: Arc<dyn DecoderFactory>,
    current: Mutex<Option<ActiveSession>>,
    /// Workers of stopped sessions that may still be unwinding.
    retired: Mutex<Vec<JoinHandle<()>>>,
}

impl Player {
    pub fn builder() -> PlayerBuilder {
        PlayerBuilder::default()
    }

    /// Starts a session for `locator`, a local path or an HTTP(S) URL.
    ///
    /// `duration` enables percent seeking and byte-based progress. The source
    /// is opened before this returns; a source that cannot be opened is not an
    /// error here but ends the session with `PlayingFailed`.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the player is stopped
    /// - whatever the decoder factory returns
    #[instrument(skip(self, locator), fields(locator = %redact_locator(locator)))]
    pub fn set_source(&self, locator: &str, duration: Option<Duration>) -> Result<()> {
        self.ensure_stopped()?;

        let decoder = self.decoders.create(self.config.decoder)?;
        let source = DataSource::open(locator, Arc::clone(&self.http), self.config.seek_floor_bytes);

        let mut current = self.current.lock();
        // Another set_source may have won while the source was opening.
        self.ensure_stopped()?;
        self.reap_retired(current.take());

        let session = self.shared.lock().begin_session();
        let feed = Arc::new(DecodeFeed::new(
            Arc::clone(&self.shared),
            session,
            source,
            Arc::clone(&self.output),
            Arc::clone(&self.events),
            duration,
        )
        .with_completion_tolerance(self.config.completion_tolerance));

        let worker_feed = Arc::clone(&feed);
        let worker = thread::Builder::new()
            .name(self.config.worker_thread_name.clone())
            .spawn(move || run_session(worker_feed, decoder))
            .map_err(|e| {
                feed.on_stop();
                PlaybackError::Internal(format!("failed to spawn decode thread: {}", e))
            })?;

        info!(session, kind = %self.config.decoder, ?duration, "Session started");
        *current = Some(ActiveSession { feed, worker });
        Ok(())
    }

    /// Resumes a paused session.
    ///
    /// # Errors
    ///
    /// `InvalidState` while stopped, and while the header is still being
    /// read; the latter also stops the session.
    pub fn play(&self) -> Result<()> {
        let mut cell = self.shared.lock();
        match cell.state {
            PlaybackState::ReadyToPlay => {
                cell.transition(PlaybackState::Playing);
                drop(cell);
                self.shared.notify_all();
                info!("Playing");
                Ok(())
            }
            PlaybackState::Playing => Ok(()),
            PlaybackState::ReadingHeader => {
                drop(cell);
                warn!("play() while reading header, stopping session");
                self.stop();
                Err(PlaybackError::InvalidState {
                    operation: "play",
                    state: PlaybackState::ReadingHeader,
                })
            }
            PlaybackState::Stopped => Err(PlaybackError::InvalidState {
                operation: "play",
                state: PlaybackState::Stopped,
            }),
        }
    }

    /// Pauses playback. Before playback has started there is nothing to
    /// pause, so the session is stopped instead.
    pub fn pause(&self) -> Result<()> {
        let mut cell = self.shared.lock();
        match cell.state {
            PlaybackState::Playing => {
                cell.transition(PlaybackState::ReadyToPlay);
                drop(cell);
                self.shared.notify_all();
                info!("Paused");
            }
            PlaybackState::ReadingHeader | PlaybackState::ReadyToPlay => {
                drop(cell);
                debug!("pause() before playback, stopping session");
                self.stop();
            }
            PlaybackState::Stopped => {}
        }
        Ok(())
    }

    /// Stops the current session, if any. Idempotent.
    ///
    /// Returns once the state is `Stopped` and the sink is released, without
    /// waiting for a blocked read; the decode thread closes the source and
    /// unwinds on its own afterwards.
    pub fn stop(&self) {
        let feed = self.current_feed();
        match feed {
            Some(feed) => feed.on_stop(),
            None => self.shared.notify_all(),
        }
    }

    /// Seeks to `percent` of the current stream.
    ///
    /// # Errors
    ///
    /// See [`DecodeFeed::set_position`]; `InvalidState` without a session.
    pub fn set_position(&self, percent: u8) -> Result<()> {
        match self.current_feed() {
            Some(feed) => feed.set_position(percent),
            None => Err(PlaybackError::InvalidState {
                operation: "set_position",
                state: PlaybackState::Stopped,
            }),
        }
    }

    /// Elapsed time of the current session in whole seconds.
    pub fn current_position(&self) -> u64 {
        self.current_feed().map_or(0, |feed| feed.current_position())
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state().is_paused()
    }

    pub fn is_stopped(&self) -> bool {
        self.state().is_stopped()
    }

    pub fn is_reading_header(&self) -> bool {
        self.state() == PlaybackState::ReadingHeader
    }

    /// Duration supplied with the current source.
    pub fn duration(&self) -> Option<Duration> {
        self.current_feed().and_then(|feed| feed.duration())
    }

    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.current_feed().and_then(|feed| feed.stream_info())
    }

    pub fn decoder_kind(&self) -> DecoderKind {
        self.config.decoder
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Subscribes to the player's own event bus. `None` when the player was
    /// built with a caller-supplied sink.
    pub fn subscribe(&self) -> Option<Receiver<PlayerEvent>> {
        self.bus.as_ref().map(EventBus::subscribe)
    }

    /// Feed of the current (or most recent) session.
    pub fn feed(&self) -> Option<Arc<DecodeFeed>> {
        self.current_feed()
    }

    fn current_feed(&self) -> Option<Arc<DecodeFeed>> {
        self.current
            .lock()
            .as_ref()
            .map(|session| Arc::clone(&session.feed))
    }

    fn ensure_stopped(&self) -> Result<()> {
        let cell = self.shared.lock();
        if cell.live {
            return Err(PlaybackError::InvalidState {
                operation: "set_source",
                state: cell.state,
            });
        }
        Ok(())
    }

    fn reap_retired(&self, previous: Option<ActiveSession>) {
        let mut retired = self.retired.lock();
        if let Some(previous) = previous {
            retired.push(previous.worker);
        }
        let (finished, running): (Vec<_>, Vec<_>) =
            retired.drain(..).partition(|handle| handle.is_finished());
        *retired = running;
        for handle in finished {
            join_worker(handle);
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
        if let Some(session) = self.current.get_mut().take() {
            join_worker(session.worker);
        }
        for handle in self.retired.get_mut().drain(..) {
            join_worker(handle);
        }
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("Decode thread panicked");
    }
}

/// Body of the decode thread.
fn run_session(feed: Arc<DecodeFeed>, mut decoder: Box<dyn DecoderSession>) {
    let span = tracing::info_span!("decode_session", session = feed.session());
    let _entered = span.enter();

    let exit = if feed.data_source_valid() {
        let exit = decoder.run(&feed);
        debug!(?exit, "Decoder returned");
        Some(exit)
    } else {
        warn!("Source unavailable, decoder not started");
        None
    };

    let superseded = feed.is_superseded();
    feed.on_stop();
    feed.close_source();
    if superseded {
        debug!("Session replaced before exit, no terminal event");
        return;
    }

    let event = if feed.source_failed() {
        PlayerEvent::PlayingFailed {
            reason: "source unavailable".to_string(),
        }
    } else {
        match exit.and_then(DecodeExit::failure_reason) {
            None => PlayerEvent::PlayingFinished,
            Some(reason) => PlayerEvent::PlayingFailed {
                reason: reason.to_string(),
            },
        }
    };
    info!(event = %event, "Session ended");
    feed.publish(event);
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Player`].
///
/// An audio output and a decoder factory are required. Without an HTTP
/// client the `desktop-shims` feature supplies a reqwest-backed one;
/// without that feature only local files can be opened.
#[derive(Default)]
pub struct PlayerBuilder {
    config: PlayerConfig,
    output: Option<Arc<dyn AudioOutput>>,
    http: Option<Arc<dyn HttpClient>>,
    events: Option<Arc<dyn EventSink>>,
    decoders: Option<Arc<dyn DecoderFactory>>,
}

impl PlayerBuilder {
    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Publishes events to `events` instead of a private [`EventBus`].
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn decoder_factory(mut self, decoders: Arc<dyn DecoderFactory>) -> Self {
        self.decoders = Some(decoders);
        self
    }

    pub fn build(self) -> Result<Player> {
        self.config
            .validate()
            .map_err(PlaybackError::InvalidArgument)?;

        let output = self
            .output
            .ok_or_else(|| PlaybackError::InvalidArgument("audio output is required".to_string()))?;
        let decoders = self
            .decoders
            .ok_or_else(|| PlaybackError::InvalidArgument("decoder factory is required".to_string()))?;

        let http = match self.http {
            Some(http) => http,
            None => default_http_client(&self.config)?,
        };

        let (events, bus) = match self.events {
            Some(events) => (events, None),
            None => {
                let bus = EventBus::new(self.config.event_buffer_size);
                (Arc::new(bus.clone()) as Arc<dyn EventSink>, Some(bus))
            }
        };

        Ok(Player {
            shared: Arc::new(SharedState::new()),
            config: self.config,
            output,
            http,
            events,
            bus,
            decoders,
            current: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
        })
    }
}

#[cfg(feature = "desktop-shims")]
fn default_http_client(config: &PlayerConfig) -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::with_timeouts(
        config.http_timeout,
        config.connect_timeout,
        &config.user_agent,
    )?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_http_client(_config: &PlayerConfig) -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(LocalOnly))
}

/// Stand-in client for builds without a desktop HTTP stack.
#[cfg(not(feature = "desktop-shims"))]
struct LocalOnly;

#[cfg(not(feature = "desktop-shims"))]
impl HttpClient for LocalOnly {
    fn execute(
        &self,
        request: bridge_traits::HttpRequest,
    ) -> bridge_traits::error::Result<bridge_traits::HttpResponse> {
        Err(bridge_traits::BridgeError::NotAvailable(format!(
            "no HTTP client configured for {}",
            redact_locator(&request.url)
        )))
    }
}

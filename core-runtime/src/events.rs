//! # Player Event Bus
//!
//! Ordered, asynchronous notifications from a player to whoever owns it,
//! built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **`PlayerEvent`**: lifecycle, progress and metadata notifications
//! - **`EventSink`**: the seam a player publishes through; callers may supply
//!   their own implementation
//! - **`EventBus`**: the default sink, a broadcast channel with independent
//!   subscribers
//! - **`EventStream`**: a filtering wrapper around a subscription
//!
//! ```text
//! ┌──────────────┐  publish   ┌───────────┐  subscribe  ┌────────────┐
//! │ decode thread├───────────>│           ├────────────>│ UI / owner │
//! └──────────────┘            │ EventBus  │             └────────────┘
//! ┌──────────────┐  publish   │ (broadcast│  subscribe  ┌────────────┐
//! │control thread├───────────>│  channel) ├────────────>│  logger    │
//! └──────────────┘            └───────────┘             └────────────┘
//! ```
//!
//! Publishing never blocks, so it is safe to publish while holding the
//! player's state lock; that is how delivery order is kept identical to the
//! order in which transitions happened.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, EventSink, PlayerEvent};
//!
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(PlayerEvent::ReadingHeader);
//! assert_eq!(rx.try_recv().unwrap(), PlayerEvent::ReadingHeader);
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell more than the buffer size
//!   behind and missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: the bus was dropped.
//!
//! Publishing with no subscribers is not an error for a player: the event is
//! dropped and logged at trace level.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError, TryRecvError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// One `PlayUpdate` is published per PCM write, so the buffer has to absorb a
/// few seconds of writes for a subscriber that polls slowly.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Event Types
// ============================================================================

/// Textual tags of the stream that just started.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackInfo {
    pub vendor: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub date: String,
    pub track: String,
}

/// Notifications published by a player, in the order the underlying
/// transitions happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// The decoder started parsing the stream header.
    ReadingHeader,
    /// The header was parsed; the player is paused and ready to play.
    ReadyToPlay,
    /// Playback progress in whole seconds.
    PlayUpdate {
        seconds: u64,
    },
    /// Stream tags became available, or changed mid-session.
    TrackInfo(TrackInfo),
    /// The decode loop ended cleanly.
    PlayingFinished,
    /// The source could not be read, or the decoder gave up.
    PlayingFailed {
        reason: String,
    },
}

impl PlayerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlayerEvent::ReadingHeader => "Reading stream header",
            PlayerEvent::ReadyToPlay => "Ready to play",
            PlayerEvent::PlayUpdate { .. } => "Playback progress",
            PlayerEvent::TrackInfo(_) => "Track info",
            PlayerEvent::PlayingFinished => "Playing finished",
            PlayerEvent::PlayingFailed { .. } => "Playing failed",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::PlayingFailed { .. } => EventSeverity::Error,
            PlayerEvent::PlayUpdate { .. } => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }

    /// Returns `true` for the events that end a playback session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlayerEvent::PlayingFinished | PlayerEvent::PlayingFailed { .. }
        )
    }
}

impl fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerEvent::PlayUpdate { seconds } => write!(f, "{} ({}s)", self.description(), seconds),
            PlayerEvent::TrackInfo(info) => {
                write!(f, "{}: {} - {}", self.description(), info.artist, info.title)
            }
            PlayerEvent::PlayingFailed { reason } => write!(f, "{}: {}", self.description(), reason),
            _ => f.write_str(self.description()),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sink Seam
// ============================================================================

/// Destination for player notifications.
///
/// Called from both the control thread and the decode thread, sometimes while
/// the player's state lock is held. Implementations must return promptly and
/// must not call back into the player.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: PlayerEvent);
}

// ============================================================================
// EventBus
// ============================================================================

/// Broadcast channel for player events.
///
/// Every subscriber receives every event published after it subscribed, in
/// publication order.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Subscribes and wraps the receiver in an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: PlayerEvent) {
        if let Err(SendError(event)) = self.emit(event) {
            tracing::trace!(event = %event, "No subscribers for player event");
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// The receive methods are synchronous: `recv_blocking` parks the calling
/// thread and must not be used from inside an async runtime.
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &PlayerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Blocks until the next matching event arrives.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once the bus is gone.
    pub fn recv_blocking(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.blocking_recv()?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns the next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Result<PlayerEvent, TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Drains every queued matching event, skipping over lag gaps.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }
}

//! # Playback State
//!
//! The state machine shared by the control thread and the decode thread, and
//! the blocking pause gate built on it.
//!
//! ```text
//! Stopped ──start header read──> ReadingHeader ──header parsed──> ReadyToPlay
//!    ^                                                              │    ^
//!    │                                                          play│    │pause
//!    │                                                              v    │
//!    └────────────────────── stop (from any state) ─────────────── Playing
//! ```
//!
//! State, the session number and the progress counters sit behind one
//! `parking_lot::Mutex`. The paired `Condvar` is used only by the pause gate:
//! a decode thread parked in `ReadyToPlay` is woken by `play`, `pause` or
//! `stop`, never by polling.

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::progress::Progress;

/// Playback state of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlaybackState {
    /// No session, or the session ended.
    #[default]
    Stopped,
    /// The decoder is parsing the stream header.
    ReadingHeader,
    /// Header parsed; paused. Also the state `pause()` returns to.
    ReadyToPlay,
    Playing,
}

impl PlaybackState {
    /// Whether `self -> next` is an edge of the state machine.
    ///
    /// Self-transitions are not edges; callers treat them as no-ops.
    pub fn can_transition_to(self, next: PlaybackState) -> bool {
        use PlaybackState::*;
        matches!(
            (self, next),
            (Stopped, ReadingHeader)
                | (ReadingHeader, ReadyToPlay)
                | (ReadyToPlay, Playing)
                | (Playing, ReadyToPlay)
                | (ReadingHeader, Stopped)
                | (ReadyToPlay, Stopped)
                | (Playing, Stopped)
        )
    }

    pub fn is_stopped(self) -> bool {
        self == PlaybackState::Stopped
    }

    /// `ReadyToPlay` is the paused state.
    pub fn is_paused(self) -> bool {
        self == PlaybackState::ReadyToPlay
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::ReadingHeader => "reading_header",
            PlaybackState::ReadyToPlay => "ready_to_play",
            PlaybackState::Playing => "playing",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything guarded by the state mutex.
#[derive(Debug, Default)]
pub(crate) struct StateCell {
    pub state: PlaybackState,
    /// Incremented by every `set_source`. A feed whose session number differs
    /// from this one is stale and observes `Stopped`.
    pub session: u64,
    /// True from `set_source` until that session is stopped.
    pub live: bool,
    pub progress: Progress,
}

impl StateCell {
    /// Whether `session` is the current session and has not been stopped.
    pub fn is_live(&self, session: u64) -> bool {
        self.live && self.session == session
    }

    /// The state as seen by a feed bound to `session`.
    pub fn state_for(&self, session: u64) -> PlaybackState {
        if self.is_live(session) {
            self.state
        } else {
            PlaybackState::Stopped
        }
    }

    /// Opens a new session and returns its number.
    pub fn begin_session(&mut self) -> u64 {
        self.session += 1;
        self.live = true;
        self.state = PlaybackState::Stopped;
        self.progress.reset();
        self.session
    }

    /// Ends the current session: `Stopped`, counters zeroed.
    pub fn end_session(&mut self) {
        self.live = false;
        self.state = PlaybackState::Stopped;
        self.progress.reset();
    }

    /// Applies `next` if it is a legal edge. Returns whether the state changed.
    pub fn transition(&mut self, next: PlaybackState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        tracing::debug!(session = self.session, from = %self.state, to = %next, "State transition");
        self.state = next;
        true
    }
}

/// The state cell plus the pause-gate condition variable.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    cell: Mutex<StateCell>,
    resume: Condvar,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, StateCell> {
        self.cell.lock()
    }

    pub fn state(&self) -> PlaybackState {
        self.cell.lock().state
    }

    /// Parks the caller while the session is paused.
    ///
    /// Returns with the lock held once the session is playing, stopped or
    /// replaced. `on_wait` runs each time before parking, with the lock held.
    pub fn wait_while_paused<F>(&self, guard: &mut MutexGuard<'_, StateCell>, session: u64, mut on_wait: F)
    where
        F: FnMut(&mut StateCell),
    {
        while guard.state_for(session).is_paused() {
            on_wait(&mut **guard);
            self.resume.wait(guard);
        }
    }

    /// Wakes every thread parked in [`wait_while_paused`](Self::wait_while_paused).
    pub fn notify_all(&self) {
        self.resume.notify_all();
    }
}

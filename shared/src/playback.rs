//! Single-owner audio playback.
//!
//! Every row that can play audio shares one [`PlaybackController`]. Starting
//! a new item always stops the previous one first, so at most one session is
//! ever audible. The controller never touches the media element itself: it
//! returns [`PlaybackCommand`]s for the shell to execute and is told about
//! the outcome through [`started`](PlaybackController::started),
//! [`progress`](PlaybackController::progress) and friends.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::event::ItemId;

/// Monotonic id of one play attempt. Shell results carry it back so results
/// for a superseded attempt can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Start requested, not yet confirmed by the shell.
    Starting { item: ItemId, session: SessionId },
    Playing {
        item: ItemId,
        session: SessionId,
        progress: f64,
    },
}

impl PlaybackState {
    fn session(&self) -> Option<SessionId> {
        match self {
            Self::Idle => None,
            Self::Starting { session, .. } | Self::Playing { session, .. } => Some(*session),
        }
    }

    fn item(&self) -> Option<&ItemId> {
        match self {
            Self::Idle => None,
            Self::Starting { item, .. } | Self::Playing { item, .. } => Some(item),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlaybackCommand {
    Start {
        session: SessionId,
        item: ItemId,
        source: String,
    },
    Stop { session: SessionId },
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackError {
    #[error("could not start playback of {item}: {reason}")]
    StartFailed { item: ItemId, reason: String },
    #[error("playback of {item} failed: {reason}")]
    Media { item: ItemId, reason: String },
}

impl PlaybackError {
    #[must_use]
    pub fn item(&self) -> &ItemId {
        match self {
            Self::StartFailed { item, .. } | Self::Media { item, .. } => item,
        }
    }
}

/// Answer to a start confirmation from the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartAck {
    /// The session is current and now counts as playing.
    Playing,
    /// The session was stopped or replaced while starting. The shell must
    /// silence it.
    Superseded(PlaybackCommand),
}

#[derive(Debug, Default)]
pub struct PlaybackController {
    state: PlaybackState,
    last_session: u64,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn current_session(&self) -> Option<SessionId> {
        self.state.session()
    }

    pub fn active_item(&self) -> Option<&ItemId> {
        self.state.item()
    }

    /// Requests playback of `item`. Stops whatever else is active first.
    /// Asking for the item that is already starting or playing does nothing.
    #[instrument(skip(self, source), fields(item = %item))]
    pub fn play(&mut self, item: ItemId, source: impl Into<String>) -> Vec<PlaybackCommand> {
        if self.state.item() == Some(&item) {
            debug!("already active");
            return Vec::new();
        }

        let mut commands = Vec::with_capacity(2);
        if let Some(session) = self.state.session() {
            commands.push(PlaybackCommand::Stop { session });
        }
        self.last_session += 1;
        let session = SessionId(self.last_session);
        info!(%session, "starting playback");
        self.state = PlaybackState::Starting {
            item: item.clone(),
            session,
        };
        commands.push(PlaybackCommand::Start {
            session,
            item,
            source: source.into(),
        });
        commands
    }

    /// Stops the active session, if any.
    pub fn stop(&mut self) -> Option<PlaybackCommand> {
        let session = self.state.session()?;
        info!(%session, "stopping playback");
        self.state = PlaybackState::Idle;
        Some(PlaybackCommand::Stop { session })
    }

    pub fn is_playing(&self, item: &ItemId) -> bool {
        matches!(&self.state, PlaybackState::Playing { item: active, .. } if active == item)
    }

    pub fn progress_of(&self, item: &ItemId) -> f64 {
        match &self.state {
            PlaybackState::Playing {
                item: active,
                progress,
                ..
            } if active == item => *progress,
            _ => 0.0,
        }
    }

    pub fn started(&mut self, session: SessionId) -> StartAck {
        match &self.state {
            PlaybackState::Starting {
                item,
                session: current,
            } if *current == session => {
                self.state = PlaybackState::Playing {
                    item: item.clone(),
                    session,
                    progress: 0.0,
                };
                StartAck::Playing
            }
            PlaybackState::Playing {
                session: current, ..
            } if *current == session => StartAck::Playing,
            _ => {
                debug!(%session, "start confirmed for superseded session");
                StartAck::Superseded(PlaybackCommand::Stop { session })
            }
        }
    }

    pub fn start_failed(
        &mut self,
        session: SessionId,
        reason: impl Into<String>,
    ) -> Option<PlaybackError> {
        match &self.state {
            PlaybackState::Starting {
                item,
                session: current,
            } if *current == session => {
                let error = PlaybackError::StartFailed {
                    item: item.clone(),
                    reason: reason.into(),
                };
                warn!(%session, error = %error, "playback start failed");
                self.state = PlaybackState::Idle;
                Some(error)
            }
            _ => None,
        }
    }

    /// Records a position report. Returns `false` if `session` is not the
    /// one playing.
    pub fn progress(&mut self, session: SessionId, elapsed_secs: f64, duration_secs: f64) -> bool {
        match &mut self.state {
            PlaybackState::Playing {
                session: current,
                progress,
                ..
            } if *current == session => {
                *progress = progress_fraction(elapsed_secs, duration_secs);
                true
            }
            _ => false,
        }
    }

    /// Natural end of the media. Returns `false` for superseded sessions.
    pub fn ended(&mut self, session: SessionId) -> bool {
        if self.state.session() != Some(session) {
            return false;
        }
        info!(%session, "playback ended");
        self.state = PlaybackState::Idle;
        true
    }

    pub fn errored(&mut self, session: SessionId, reason: impl Into<String>) -> Option<PlaybackError> {
        if self.state.session() != Some(session) {
            return None;
        }
        let item = self.state.item()?.clone();
        let error = PlaybackError::Media {
            item,
            reason: reason.into(),
        };
        warn!(%session, error = %error, "playback failed");
        self.state = PlaybackState::Idle;
        Some(error)
    }
}

/// `elapsed / duration` clamped to `[0, 1]`; zero when the duration is not
/// a usable number.
#[must_use]
pub fn progress_fraction(elapsed_secs: f64, duration_secs: f64) -> f64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 || !elapsed_secs.is_finite() {
        return 0.0;
    }
    (elapsed_secs / duration_secs).clamp(0.0, 1.0)
}

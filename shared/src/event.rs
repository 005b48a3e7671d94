use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::{AudioResult, DelayOutput};
use crate::config::CoreConfig;
use crate::list::{DebounceTicket, FetchResult, QueryChange, RequestToken};
use crate::playback::SessionId;
use crate::realtime::{PushMessage, TimerHandle, Topic};

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(ScreenId);
typed_id!(ItemId);

// --- Time ---

/// Milliseconds since the Unix epoch, always supplied by the shell. The core
/// never reads a clock of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn elapsed_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    #[must_use]
    pub fn add_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    #[must_use]
    pub fn is_before(self, other: Self) -> bool {
        self.0 < other.0
    }
}

// --- Event enum: large variants boxed ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Configure(Box<CoreConfig>),

    // Screen lifecycle
    ScreenMounted {
        screen: ScreenId,
        collection: String,
        topics: Vec<Topic>,
        /// Falls back to the configured default when absent.
        page_size: Option<u32>,
    },
    ScreenUnmounted {
        screen: ScreenId,
    },

    // List input
    QueryEdited {
        screen: ScreenId,
        change: QueryChange,
    },
    SearchTyped {
        screen: ScreenId,
        text: String,
    },
    RetryRequested {
        screen: ScreenId,
    },

    // Realtime
    PushReceived {
        message: Box<PushMessage>,
        received_at: UnixTimeMs,
    },

    // Playback
    PlayRequested {
        item: ItemId,
        source: String,
    },
    StopRequested,

    ToastDismissed,

    // Capability responses (never sent by the shell)
    #[serde(skip)]
    SearchSettled {
        screen: ScreenId,
        ticket: DebounceTicket,
    },
    #[serde(skip)]
    PageFetched {
        screen: ScreenId,
        token: RequestToken,
        result: Box<FetchResult>,
    },
    #[serde(skip)]
    DedupeTimerFired {
        handle: TimerHandle,
        fired: DelayOutput,
    },
    #[serde(skip)]
    ToastExpired {
        toast: u64,
    },
    #[serde(skip)]
    AudioStarted {
        session: SessionId,
        result: Box<AudioResult>,
    },
    #[serde(skip)]
    AudioProgressed {
        session: SessionId,
        result: Box<AudioResult>,
    },
}

impl Event {
    /// Short name used in log spans.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::ScreenMounted { .. } => "screen_mounted",
            Self::ScreenUnmounted { .. } => "screen_unmounted",
            Self::QueryEdited { .. } => "query_edited",
            Self::SearchTyped { .. } => "search_typed",
            Self::RetryRequested { .. } => "retry_requested",
            Self::PushReceived { .. } => "push_received",
            Self::PlayRequested { .. } => "play_requested",
            Self::StopRequested => "stop_requested",
            Self::ToastDismissed => "toast_dismissed",
            Self::SearchSettled { .. } => "search_settled",
            Self::PageFetched { .. } => "page_fetched",
            Self::DedupeTimerFired { .. } => "dedupe_timer_fired",
            Self::ToastExpired { .. } => "toast_expired",
            Self::AudioStarted { .. } => "audio_started",
            Self::AudioProgressed { .. } => "audio_progressed",
        }
    }
}

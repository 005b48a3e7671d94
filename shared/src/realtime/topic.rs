use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name of a channel on the refresh bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub const RECORDS_CHANGED: &'static str = "records-changed";
    pub const UNREAD_COUNT_CHANGED: &'static str = "unread-count-changed";
    pub const RECORD_CREATED: &'static str = "record-created";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn records_changed() -> Self {
        Self::new(Self::RECORDS_CHANGED)
    }

    pub fn unread_count_changed() -> Self {
        Self::new(Self::UNREAD_COUNT_CHANGED)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Message as delivered by the push transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub topic: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Inbound topics this core acts on. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    RecordsChanged,
    UnreadCountChanged,
    RecordCreated,
}

impl InboundKind {
    #[must_use]
    pub fn classify(topic: &str) -> Option<Self> {
        match topic {
            Topic::RECORDS_CHANGED => Some(Self::RecordsChanged),
            Topic::UNREAD_COUNT_CHANGED => Some(Self::UnreadCountChanged),
            Topic::RECORD_CREATED => Some(Self::RecordCreated),
            _ => None,
        }
    }

    /// Bus topics to publish when this message arrives. A new record changes
    /// both the lists and the unread count.
    #[must_use]
    pub fn refresh_topics(self) -> Vec<Topic> {
        match self {
            Self::RecordsChanged => vec![Topic::records_changed()],
            Self::UnreadCountChanged => vec![Topic::unread_count_changed()],
            Self::RecordCreated => vec![Topic::records_changed(), Topic::unread_count_changed()],
        }
    }
}

/// What a subscriber receives on publish.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicEvent {
    pub topic: Topic,
    pub payload: Option<Value>,
}

//! Push-driven refresh: the topic bus screens subscribe to and the
//! short-horizon dedupe applied to inbound notifications.

mod coordinator;
mod dedupe;
mod topic;

pub use self::coordinator::{
    Callback, PublishReport, RefreshCoordinator, SubscriberError, SubscriptionToken,
};
pub use self::dedupe::{DedupeCache, DedupeEntry, NotificationIdentity, Sighting, TimerHandle};
pub use self::topic::{InboundKind, PushMessage, Topic, TopicEvent};

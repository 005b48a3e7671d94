use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::topic::{Topic, TopicEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriberError {
    #[error("subscriber failed: {0}")]
    Failed(String),
    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

/// Subscriber callback. `Ctx` is whatever the publisher lends for the
/// duration of one publish, so callbacks can record work without shared
/// mutable state.
pub type Callback<Ctx> =
    Box<dyn FnMut(&TopicEvent, &mut Ctx) -> Result<(), SubscriberError> + Send + Sync>;

struct Subscription<Ctx> {
    token: SubscriptionToken,
    callback: Callback<Ctx>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: Vec<SubscriberError>,
}

/// Named-topic publish/subscribe bus.
///
/// Dispatch is synchronous, in subscription order, once per live
/// subscription. Nothing is buffered: a subscriber only sees publishes made
/// while it is subscribed.
pub struct RefreshCoordinator<Ctx = ()> {
    next_token: u64,
    subscriptions: HashMap<Topic, Vec<Subscription<Ctx>>>,
    topic_of: HashMap<SubscriptionToken, Topic>,
}

impl<Ctx> Default for RefreshCoordinator<Ctx> {
    fn default() -> Self {
        Self {
            next_token: 0,
            subscriptions: HashMap::new(),
            topic_of: HashMap::new(),
        }
    }
}

impl<Ctx> fmt::Debug for RefreshCoordinator<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .subscriptions
            .iter()
            .map(|(topic, subs)| (topic.as_str(), subs.len()))
            .collect();
        f.debug_struct("RefreshCoordinator")
            .field("subscriptions", &counts)
            .finish()
    }
}

impl<Ctx> RefreshCoordinator<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, topic: Topic, callback: F) -> SubscriptionToken
    where
        F: FnMut(&TopicEvent, &mut Ctx) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.next_token += 1;
        let token = SubscriptionToken(self.next_token);
        self.topic_of.insert(token, topic.clone());
        self.subscriptions
            .entry(topic)
            .or_default()
            .push(Subscription {
                token,
                callback: Box::new(callback),
            });
        token
    }

    /// Removes a subscription. Unknown or already-removed tokens are ignored.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) {
        let Some(topic) = self.topic_of.remove(&token) else {
            return;
        };
        if let Some(subs) = self.subscriptions.get_mut(&topic) {
            subs.retain(|s| s.token != token);
            if subs.is_empty() {
                self.subscriptions.remove(&topic);
            }
        }
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscriptions.get(topic).map_or(0, Vec::len)
    }

    /// Invokes every live subscriber of `topic`. A subscriber that errors or
    /// panics is logged and counted; the rest still run.
    #[instrument(skip(self, payload, ctx), fields(topic = %topic))]
    pub fn publish(&mut self, topic: &Topic, payload: Option<Value>, ctx: &mut Ctx) -> PublishReport {
        let mut report = PublishReport::default();
        let Some(subs) = self.subscriptions.get_mut(topic) else {
            debug!("no subscribers");
            return report;
        };

        let event = TopicEvent {
            topic: topic.clone(),
            payload,
        };
        for sub in subs.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (sub.callback)(&event, ctx)));
            let result = match outcome {
                Ok(result) => result,
                Err(panic) => Err(SubscriberError::Panicked(panic_message(&*panic))),
            };
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(subscription = sub.token.0, error = %e, "subscriber callback failed");
                    report.failed.push(e);
                }
            }
        }
        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn recorder(
        name: &'static str,
    ) -> impl FnMut(&TopicEvent, &mut Log) -> Result<(), SubscriberError> + Send + Sync {
        move |_, log| {
            log.push(name);
            Ok(())
        }
    }

    #[test]
    fn fan_out_survives_a_failing_subscriber() {
        let mut bus = RefreshCoordinator::<Vec<&'static str>>::new();
        let topic = Topic::records_changed();
        bus.subscribe(topic.clone(), recorder("first"));
        bus.subscribe(topic.clone(), |_, log: &mut Vec<&'static str>| {
            log.push("second");
            Err(SubscriberError::Failed("boom".into()))
        });
        bus.subscribe(topic.clone(), recorder("third"));

        let mut log = Vec::new();
        let report = bus.publish(&topic, None, &mut log);
        assert_eq!(log, ["first", "second", "third"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec![SubscriberError::Failed("boom".into())]);
    }

    #[test]
    fn fan_out_survives_a_panicking_subscriber() {
        let mut bus = RefreshCoordinator::<Vec<&'static str>>::new();
        let topic = Topic::records_changed();
        bus.subscribe(topic.clone(), recorder("first"));
        bus.subscribe(topic.clone(), |_, _: &mut Vec<&'static str>| panic!("kaboom"));
        bus.subscribe(topic.clone(), recorder("third"));

        let mut log = Vec::new();
        let report = bus.publish(&topic, None, &mut log);
        assert_eq!(log, ["first", "third"]);
        assert_eq!(report.failed, vec![SubscriberError::Panicked("kaboom".into())]);

        // The bus stays usable afterwards.
        let mut log = Vec::new();
        bus.publish(&topic, None, &mut log);
        assert_eq!(log, ["first", "third"]);
    }

    #[test]
    fn unsubscribed_screen_is_not_invoked() {
        let mut bus = RefreshCoordinator::<Vec<&'static str>>::new();
        let topic = Topic::records_changed();
        bus.subscribe(topic.clone(), recorder("a"));
        bus.subscribe(topic.clone(), recorder("b"));
        let gone = bus.subscribe(topic.clone(), recorder("c"));
        bus.unsubscribe(gone);
        bus.unsubscribe(gone);

        let mut log = Vec::new();
        bus.publish(&topic, None, &mut log);
        assert_eq!(log, ["a", "b"]);
        assert_eq!(bus.subscriber_count(&topic), 2);
    }

    #[test]
    fn publish_only_reaches_that_topic() {
        let mut bus = RefreshCoordinator::<Vec<&'static str>>::new();
        bus.subscribe(Topic::records_changed(), recorder("records"));
        bus.subscribe(Topic::unread_count_changed(), recorder("badge"));

        let mut log = Vec::new();
        bus.publish(&Topic::unread_count_changed(), None, &mut log);
        assert_eq!(log, ["badge"]);

        let report = bus.publish(&Topic::new("nobody-listens"), None, &mut log);
        assert_eq!(report, PublishReport::default());
    }

    #[test]
    fn payload_reaches_subscribers() {
        let mut bus = RefreshCoordinator::<Vec<serde_json::Value>>::new();
        bus.subscribe(Topic::records_changed(), |event, seen| {
            seen.extend(event.payload.clone());
            Ok(())
        });
        let mut seen = Vec::new();
        bus.publish(
            &Topic::records_changed(),
            Some(serde_json::json!({"id": 1})),
            &mut seen,
        );
        assert_eq!(seen, vec![serde_json::json!({"id": 1})]);
    }

    #[test]
    fn no_replay_for_late_subscribers() {
        let mut bus = RefreshCoordinator::<Vec<&'static str>>::new();
        let topic = Topic::records_changed();
        let mut log = Vec::new();
        bus.publish(&topic, None, &mut log);
        bus.subscribe(topic.clone(), recorder("late"));
        assert!(log.is_empty());
    }
}

#![allow(dead_code)]

use crux_core::testing::AppTester;
use crux_core::Request;
use recordsync::capabilities::{
    AudioOperation, AudioResult, DelayOperation, DelayOutput, FetchOperation,
};
use recordsync::list::{FetchResult, Record};
use recordsync::realtime::{PushMessage, Topic};
use recordsync::{App, CoreConfig, Effect, Event, Model, ScreenId, UnixTimeMs};
use serde_json::{json, Value};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub type Tester = AppTester<App, Effect>;

/// Effects of one or more updates, split by capability.
#[derive(Default)]
pub struct Effects {
    pub renders: usize,
    pub fetches: Vec<Request<FetchOperation>>,
    pub audio: Vec<Request<AudioOperation>>,
    pub delays: Vec<Request<DelayOperation>>,
}

impl Effects {
    pub fn from_effects(effects: Vec<Effect>) -> Self {
        let mut out = Self::default();
        for effect in effects {
            match effect {
                Effect::Render(_) => out.renders += 1,
                Effect::Fetch(request) => out.fetches.push(request),
                Effect::Audio(request) => out.audio.push(request),
                Effect::Delay(request) => out.delays.push(request),
            }
        }
        out
    }

    pub fn extend(&mut self, other: Self) {
        self.renders += other.renders;
        self.fetches.extend(other.fetches);
        self.audio.extend(other.audio);
        self.delays.extend(other.delays);
    }

    pub fn is_empty(&self) -> bool {
        self.renders == 0
            && self.fetches.is_empty()
            && self.audio.is_empty()
            && self.delays.is_empty()
    }

    pub fn single_fetch(mut self) -> Request<FetchOperation> {
        assert_eq!(self.fetches.len(), 1, "expected exactly one fetch");
        self.fetches.remove(0)
    }

    pub fn fetched_collections(&self) -> Vec<String> {
        self.fetches
            .iter()
            .map(|r| r.operation.request().collection.clone())
            .collect()
    }
}

/// Routes core logs to the test harness. Set `RUST_LOG=recordsync=debug`
/// to see them.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn send(app: &Tester, model: &mut Model, event: Event) -> Effects {
    init_tracing();
    Effects::from_effects(app.update(event, model).effects)
}

/// Feeds events produced by a resolved request back into the app.
fn feed(app: &Tester, model: &mut Model, events: Vec<Event>) -> Effects {
    let mut out = Effects::default();
    for event in events {
        out.extend(send(app, model, event));
    }
    out
}

pub fn resolve_fetch(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<FetchOperation>,
    result: FetchResult,
) -> Effects {
    let update = app.resolve(request, result).expect("fetch resolves");
    let mut out = Effects::from_effects(update.effects);
    out.extend(feed(app, model, update.events));
    out
}

pub fn resolve_delay(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<DelayOperation>,
    now: u64,
) -> Effects {
    let update = app
        .resolve(request, DelayOutput { now: UnixTimeMs(now) })
        .expect("delay resolves");
    let mut out = Effects::from_effects(update.effects);
    out.extend(feed(app, model, update.events));
    out
}

pub fn resolve_audio(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<AudioOperation>,
    result: AudioResult,
) -> Effects {
    let update = app.resolve(request, result).expect("audio resolves");
    let mut out = Effects::from_effects(update.effects);
    out.extend(feed(app, model, update.events));
    out
}

pub fn mount(
    app: &Tester,
    model: &mut Model,
    screen: &str,
    collection: &str,
    topics: &[&str],
    page_size: u32,
) -> Effects {
    send(
        app,
        model,
        Event::ScreenMounted {
            screen: ScreenId::new(screen),
            collection: collection.into(),
            topics: topics.iter().map(|t| Topic::new(*t)).collect(),
            page_size: Some(page_size),
        },
    )
}

pub fn push(app: &Tester, model: &mut Model, topic: &str, payload: Option<Value>, at: u64) -> Effects {
    send(
        app,
        model,
        Event::PushReceived {
            message: Box::new(PushMessage {
                topic: topic.into(),
                payload,
            }),
            received_at: UnixTimeMs(at),
        },
    )
}

pub fn configure(app: &Tester, model: &mut Model, config: CoreConfig) -> Effects {
    send(app, model, Event::Configure(Box::new(config)))
}

pub fn records(range: std::ops::Range<u64>) -> Vec<Record> {
    range
        .map(|i| Record::from_pairs([("id", json!(i)), ("Name", json!(format!("n{i:03}")))]))
        .collect()
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().filter_map(Record::id).collect()
}

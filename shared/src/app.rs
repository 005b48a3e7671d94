//! The Crux app: turns shell events into engine calls and effect requests.
//!
//! All three engines are plain state machines owned by the [`Model`]. This
//! module only routes: it hands fetch plans to the `Fetch` capability,
//! playback commands to `Audio`, timers to `Delay`, and feeds the shell's
//! answers back into the engines.

use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use crate::capabilities::{AudioOutput, AudioResult, Capabilities};
use crate::config::CoreConfig;
use crate::event::{Event, ItemId, ScreenId, UnixTimeMs};
use crate::list::{
    ApplyOutcome, FetchPlan, FetchResult, ListQuery, QueryChange, QueryPlan, RequestToken,
    WindowedListController,
};
use crate::model::{ListScreen, Model, PlaybackView, RefreshQueue, ScreenView, ToastKind, ToastView, ViewModel};
use crate::playback::{PlaybackCommand, SessionId, StartAck};
use crate::realtime::{
    InboundKind, NotificationIdentity, PushMessage, Sighting, TimerHandle, Topic,
};
use crate::AppError;

#[derive(Default)]
pub struct App;

impl App {
    fn fetch(screen: &ScreenId, plan: FetchPlan, caps: &Capabilities) {
        let screen = screen.clone();
        let FetchPlan { token, request } = plan;
        caps.fetch.list_page(request, move |result| Event::PageFetched {
            screen,
            token,
            result: Box::new(result),
        });
    }

    fn run_plan(screen: &ScreenId, plan: QueryPlan, caps: &Capabilities) {
        match plan {
            QueryPlan::Fetch(plan) => Self::fetch(screen, plan, caps),
            QueryPlan::Local => {}
        }
    }

    fn mount(
        model: &mut Model,
        screen: ScreenId,
        collection: String,
        topics: Vec<Topic>,
        page_size: Option<u32>,
        caps: &Capabilities,
    ) {
        if model.screens.contains_key(&screen) {
            debug!(%screen, "screen remounted, dropping previous state");
            Self::unmount(model, &screen);
        }

        let query = page_size
            .and_then(|size| ListQuery::first_page(size).ok())
            .or_else(|| ListQuery::first_page(model.config.default_page_size).ok());
        let Some(query) = query else {
            warn!(%screen, "no valid page size, screen not mounted");
            return;
        };

        let controller =
            WindowedListController::new(collection, query.clone(), model.config.list_settings());
        let mut list = ListScreen::new(controller);

        for topic in topics {
            let target = screen.clone();
            let token = model.refresh.subscribe(topic, move |_, queue: &mut RefreshQueue| {
                queue.push(target.clone());
                Ok(())
            });
            list.subscriptions.push(token);
        }

        let plan = list.controller.set_query(query);
        info!(%screen, collection = list.controller.collection(), "screen mounted");
        model.screens.insert(screen.clone(), list);
        Self::run_plan(&screen, plan, caps);
    }

    fn unmount(model: &mut Model, screen: &ScreenId) -> bool {
        let Some(list) = model.screens.remove(screen) else {
            return false;
        };
        for token in list.subscriptions {
            model.refresh.unsubscribe(token);
        }
        info!(%screen, "screen unmounted");
        true
    }

    /// Applies one edit to a screen's query. Returns `false` when the screen
    /// is unknown or the edit is invalid.
    fn edit_query(
        model: &mut Model,
        screen: &ScreenId,
        change: QueryChange,
        caps: &Capabilities,
    ) -> bool {
        let Some(list) = model.screens.get_mut(screen) else {
            debug!(%screen, "query edit for unmounted screen");
            return false;
        };
        if matches!(change, QueryChange::Search(_)) {
            // An explicit search supersedes anything still settling.
            list.search.cancel();
        }
        match list.controller.query().apply(change) {
            Ok(query) => {
                let plan = list.controller.set_query(query);
                Self::run_plan(screen, plan, caps);
                true
            }
            Err(e) => {
                warn!(%screen, error = %e, "rejected query edit");
                false
            }
        }
    }

    fn page_fetched(
        model: &mut Model,
        screen: &ScreenId,
        token: RequestToken,
        result: FetchResult,
    ) -> bool {
        let Some(list) = model.screens.get_mut(screen) else {
            debug!(%screen, "fetch result for unmounted screen");
            return false;
        };
        !matches!(list.controller.apply(token, result), ApplyOutcome::Stale)
    }

    /// Publishes `topics` and re-fetches every screen that asked for it,
    /// once per screen even if it listens on several of the topics.
    fn publish(model: &mut Model, topics: &[Topic], payload: Option<&Value>, caps: &Capabilities) {
        let mut queue = RefreshQueue::new();
        for topic in topics {
            let report = model.refresh.publish(topic, payload.cloned(), &mut queue);
            if !report.failed.is_empty() {
                warn!(%topic, failed = report.failed.len(), "some subscribers failed");
            }
        }

        let mut seen = std::collections::HashSet::new();
        queue.retain(|screen| seen.insert(screen.clone()));
        for screen in queue {
            if let Some(list) = model.screens.get_mut(&screen) {
                let plan = list.controller.refresh();
                Self::fetch(&screen, plan, caps);
            }
        }
    }

    fn push_received(
        model: &mut Model,
        message: PushMessage,
        received_at: UnixTimeMs,
        caps: &Capabilities,
    ) -> bool {
        let Some(kind) = InboundKind::classify(&message.topic) else {
            debug!(topic = %message.topic, "ignoring unknown push topic");
            return false;
        };

        let mut rendered = false;
        if kind == InboundKind::RecordCreated {
            let identity = NotificationIdentity::from_payload(
                &message.topic,
                message.payload.as_ref(),
                &model.config.identity_fields,
            );
            if let Some(key) = identity {
                match model.dedupe.check(key.clone(), received_at) {
                    Sighting::Duplicate => {
                        debug!(%key, "duplicate notification suppressed");
                        return false;
                    }
                    Sighting::New { timer, expires_at } => {
                        Self::arm_eviction(timer, expires_at.elapsed_since(received_at), caps);
                    }
                }
            }
            let text = new_record_message(message.payload.as_ref());
            Self::toast(model, text, ToastKind::Info, caps);
            rendered = true;
        }

        Self::publish(model, &kind.refresh_topics(), message.payload.as_ref(), caps);
        rendered
    }

    fn arm_eviction(handle: TimerHandle, millis: u64, caps: &Capabilities) {
        caps.delay
            .after(millis, move |fired| Event::DedupeTimerFired { handle, fired });
    }

    fn toast(model: &mut Model, message: impl Into<String>, kind: ToastKind, caps: &Capabilities) {
        let id = model.show_toast(message, kind);
        caps.delay
            .after(model.config.toast_duration_ms, move |_| Event::ToastExpired { toast: id });
    }

    fn run_playback(commands: Vec<PlaybackCommand>, caps: &Capabilities) {
        for command in commands {
            match command {
                PlaybackCommand::Stop { session } => caps.audio.stop(session),
                PlaybackCommand::Start {
                    session, source, ..
                } => caps.audio.play(session, source, move |result| Event::AudioStarted {
                    session,
                    result: Box::new(result),
                }),
            }
        }
    }

    fn poll_audio(session: SessionId, caps: &Capabilities) {
        caps.audio.poll(session, move |result| Event::AudioProgressed {
            session,
            result: Box::new(result),
        });
    }

    fn audio_started(
        model: &mut Model,
        session: SessionId,
        result: AudioResult,
        caps: &Capabilities,
    ) -> bool {
        match result {
            Ok(_) => match model.playback.started(session) {
                StartAck::Playing => {
                    Self::poll_audio(session, caps);
                    true
                }
                StartAck::Superseded(stop) => {
                    Self::run_playback(vec![stop], caps);
                    false
                }
            },
            Err(e) => match model.playback.start_failed(session, e.to_string()) {
                Some(error) => {
                    let error = AppError::from(error);
                    Self::toast(model, error.user_facing_message(), ToastKind::Error, caps);
                    true
                }
                None => false,
            },
        }
    }

    fn audio_progressed(
        model: &mut Model,
        session: SessionId,
        result: AudioResult,
        caps: &Capabilities,
    ) -> bool {
        match result {
            Ok(AudioOutput::Status { ended: true, .. }) => model.playback.ended(session),
            Ok(AudioOutput::Status {
                elapsed_secs,
                duration_secs,
                ended: false,
            }) => {
                let current = model.playback.progress(session, elapsed_secs, duration_secs);
                if current {
                    Self::poll_audio(session, caps);
                }
                current
            }
            Ok(AudioOutput::Started) => {
                // No position yet; keep polling while the session is current.
                debug!(%session, "start output while polling");
                if model.playback.current_session() == Some(session) {
                    Self::poll_audio(session, caps);
                }
                false
            }
            Err(e) => match model.playback.errored(session, e.to_string()) {
                Some(error) => {
                    let error = AppError::from(error);
                    Self::toast(model, error.user_facing_message(), ToastKind::Error, caps);
                    true
                }
                None => false,
            },
        }
    }

    fn configure(model: &mut Model, config: CoreConfig, caps: &Capabilities) {
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected configuration");
            let error = AppError::from(e);
            Self::toast(model, error.user_facing_message(), ToastKind::Error, caps);
            return;
        }
        model.dedupe.set_horizon(config.dedupe_horizon_ms);
        let settings = config.list_settings();
        for list in model.screens.values_mut() {
            list.controller.set_settings(settings.clone());
        }
        info!(
            snapshot_cap = config.snapshot_cap,
            search_debounce_ms = config.search_debounce_ms,
            "configuration applied"
        );
        model.config = config;
    }

    fn play_requested(model: &mut Model, item: ItemId, source: String, caps: &Capabilities) {
        let commands = model.playback.play(item, source);
        Self::run_playback(commands, caps);
    }
}

/// Toast text for a new record: the payload's `title` or `message` when it
/// has one.
fn new_record_message(payload: Option<&Value>) -> String {
    payload
        .and_then(Value::as_object)
        .and_then(|object| {
            ["title", "message"]
                .iter()
                .find_map(|field| object.get(*field)?.as_str())
        })
        .filter(|text| !text.is_empty())
        .map_or_else(|| "New record received".to_owned(), str::to_owned)
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let span = info_span!("update", event = event.name());
        let _guard = span.enter();

        let render = match event {
            Event::Configure(config) => {
                Self::configure(model, *config, caps);
                true
            }

            Event::ScreenMounted {
                screen,
                collection,
                topics,
                page_size,
            } => {
                Self::mount(model, screen, collection, topics, page_size, caps);
                true
            }

            Event::ScreenUnmounted { screen } => Self::unmount(model, &screen),

            Event::QueryEdited { screen, change } => {
                Self::edit_query(model, &screen, change, caps)
            }

            Event::SearchTyped { screen, text } => {
                match model.screens.get_mut(&screen) {
                    Some(list) => {
                        let ticket = list.search.push(text);
                        caps.delay.after(model.config.search_debounce_ms, move |_| {
                            Event::SearchSettled { screen, ticket }
                        });
                        true
                    }
                    None => false,
                }
            }

            Event::SearchSettled { screen, ticket } => {
                let settled = model
                    .screens
                    .get_mut(&screen)
                    .and_then(|list| list.search.settle(ticket));
                match settled {
                    Some(text) => Self::edit_query(model, &screen, QueryChange::Search(text), caps),
                    None => false,
                }
            }

            Event::RetryRequested { screen } => match model.screens.get_mut(&screen) {
                Some(list) => {
                    let plan = list.controller.retry();
                    Self::fetch(&screen, plan, caps);
                    true
                }
                None => false,
            },

            Event::PageFetched {
                screen,
                token,
                result,
            } => Self::page_fetched(model, &screen, token, *result),

            Event::PushReceived {
                message,
                received_at,
            } => Self::push_received(model, *message, received_at, caps),

            Event::DedupeTimerFired { handle, fired } => {
                model.dedupe.expire(handle);
                model.dedupe.expire_due(fired.now);
                false
            }

            Event::PlayRequested { item, source } => {
                Self::play_requested(model, item, source, caps);
                true
            }

            Event::StopRequested => match model.playback.stop() {
                Some(command) => {
                    Self::run_playback(vec![command], caps);
                    true
                }
                None => false,
            },

            Event::AudioStarted { session, result } => {
                Self::audio_started(model, session, *result, caps)
            }

            Event::AudioProgressed { session, result } => {
                Self::audio_progressed(model, session, *result, caps)
            }

            Event::ToastDismissed => {
                model.clear_toast();
                true
            }

            Event::ToastExpired { toast } => model.expire_toast(toast),
        };

        if render {
            caps.render.render();
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel {
            screens: model
                .screens
                .iter()
                .map(|(id, list)| ScreenView::new(id, list))
                .collect(),
            playback: PlaybackView::from(&model.playback),
            toast: model.toast.as_ref().map(ToastView::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_record_message_prefers_title() {
        assert_eq!(
            new_record_message(Some(&json!({"title": "Call from Ada", "message": "x"}))),
            "Call from Ada"
        );
        assert_eq!(
            new_record_message(Some(&json!({"message": "Voicemail"}))),
            "Voicemail"
        );
        assert_eq!(new_record_message(Some(&json!({"title": ""}))), "New record received");
        assert_eq!(new_record_message(None), "New record received");
    }
}

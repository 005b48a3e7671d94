use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CoreConfig;
use crate::event::{ItemId, ScreenId};
use crate::list::{
    Debouncer, ListMode, ListQuery, ListWindowState, Record, SortSpec, TotalEstimate,
    WindowedListController,
};
use crate::playback::{PlaybackController, PlaybackState};
use crate::realtime::{DedupeCache, RefreshCoordinator, SubscriptionToken};
use crate::UserFacingError;

/// Screens a publish asked to re-fetch, collected while the bus dispatches.
pub type RefreshQueue = Vec<ScreenId>;

/// One mounted list screen. Created on mount, dropped on unmount.
#[derive(Debug)]
pub struct ListScreen {
    pub controller: WindowedListController,
    pub search: Debouncer<String>,
    pub subscriptions: Vec<SubscriptionToken>,
}

impl ListScreen {
    pub fn new(controller: WindowedListController) -> Self {
        Self {
            controller,
            search: Debouncer::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Search text as the user sees it: the pending input if one is still
    /// settling, otherwise the text in the applied query.
    pub fn search_text(&self) -> &str {
        self.search
            .pending()
            .map_or_else(|| self.controller.query().search_text(), String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
pub struct Model {
    pub config: CoreConfig,
    pub screens: BTreeMap<ScreenId, ListScreen>,
    pub refresh: RefreshCoordinator<RefreshQueue>,
    pub dedupe: DedupeCache,
    pub playback: PlaybackController,
    pub toast: Option<Toast>,
    next_toast: u64,
}

impl Model {
    /// Replaces the visible toast and returns its id.
    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) -> u64 {
        self.next_toast += 1;
        self.toast = Some(Toast {
            id: self.next_toast,
            message: message.into(),
            kind,
            duration_ms: self.config.toast_duration_ms,
        });
        self.next_toast
    }

    /// Clears the toast if `id` is still the one showing.
    pub fn expire_toast(&mut self, id: u64) -> bool {
        if self.toast.as_ref().is_some_and(|t| t.id == id) {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn clear_toast(&mut self) {
        self.toast = None;
    }
}

// --- View models ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScreenView {
    pub screen: ScreenId,
    pub collection: String,
    pub mode: ListMode,
    pub items: Vec<Record>,
    pub page_index: u32,
    pub page_size: u32,
    pub search_text: String,
    pub sort: Option<SortSpec>,
    pub displayed_total: u64,
    pub total_is_exact: bool,
    /// `"24"` for an exact count, `"11+"` for a lower bound.
    pub total_label: String,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<UserFacingError>,
    pub snapshot_truncated: bool,
}

impl ScreenView {
    pub fn new(screen: &ScreenId, list: &ListScreen) -> Self {
        let query: &ListQuery = list.controller.query();
        let state: &ListWindowState = list.controller.view();
        let estimate = TotalEstimate {
            value: state.displayed_total,
            exact: state.total_is_exact,
        };
        Self {
            screen: screen.clone(),
            collection: list.controller.collection().to_owned(),
            mode: state.mode,
            items: state.items.clone(),
            page_index: query.page_index(),
            page_size: query.page_size(),
            search_text: list.search_text().to_owned(),
            sort: query.sort().cloned(),
            displayed_total: state.displayed_total,
            total_is_exact: state.total_is_exact,
            total_label: estimate.label(),
            has_more: state.has_more_hint,
            loading: state.loading,
            error: state.error.as_ref().map(UserFacingError::from),
            snapshot_truncated: state.snapshot_truncated,
        }
    }
}

/// What each row consults to draw its play button and progress bar.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct PlaybackView {
    pub item: Option<ItemId>,
    /// False while the start is still pending.
    pub playing: bool,
    pub progress: f64,
}

impl From<&PlaybackController> for PlaybackView {
    fn from(controller: &PlaybackController) -> Self {
        match controller.state() {
            PlaybackState::Idle => Self::default(),
            PlaybackState::Starting { item, .. } => Self {
                item: Some(item.clone()),
                playing: false,
                progress: 0.0,
            },
            PlaybackState::Playing { item, progress, .. } => Self {
                item: Some(item.clone()),
                playing: true,
                progress: *progress,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&Toast> for ToastView {
    fn from(t: &Toast) -> Self {
        Self {
            message: t.message.clone(),
            kind: t.kind,
            duration_ms: t.duration_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct ViewModel {
    pub screens: Vec<ScreenView>,
    pub playback: PlaybackView,
    pub toast: Option<ToastView>,
}

impl ViewModel {
    pub fn screen(&self, id: &ScreenId) -> Option<&ScreenView> {
        self.screens.iter().find(|s| &s.screen == id)
    }
}

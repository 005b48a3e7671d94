use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::page::{FetchResult, PageRequest, PageResponse};
use super::query::{ListQuery, QueryShape, SortSpec};
use super::record::Record;
use super::sort::SortPolicy;
use super::total::{PageObservation, TotalEstimator};
use crate::AppError;

/// Opaque id of one issued fetch. Only the latest token's result is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestToken(Uuid);

impl RequestToken {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListMode {
    #[default]
    ServerPaginated,
    ClientSortedSnapshot,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListWindowState {
    pub mode: ListMode,
    pub items: Vec<Record>,
    pub displayed_total: u64,
    pub total_is_exact: bool,
    pub has_more_hint: bool,
    pub in_flight: Option<RequestToken>,
    pub loading: bool,
    pub error: Option<AppError>,
    /// The snapshot hit the fetch cap, so more records may exist beyond it.
    pub snapshot_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub token: RequestToken,
    pub request: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// The caller must issue this request and hand the result to
    /// [`WindowedListController::apply`].
    Fetch(FetchPlan),
    /// Served from the held snapshot; the view is already updated.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Failed,
    /// The result belonged to a superseded request and was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct ListSettings {
    pub snapshot_cap: u32,
    pub sort_policy: SortPolicy,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            snapshot_cap: crate::DEFAULT_SNAPSHOT_CAP,
            sort_policy: SortPolicy::new(["Duration", "duration"]),
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    shape: QueryShape,
    /// Records in fetch order; re-sorting always starts from here.
    raw: Vec<Record>,
    sorted: Vec<Record>,
    sorted_by: SortSpec,
    truncated: bool,
}

/// Keeps one screen's visible window consistent with a paged backend.
#[derive(Debug)]
pub struct WindowedListController {
    collection: String,
    settings: ListSettings,
    query: ListQuery,
    state: ListWindowState,
    estimator: TotalEstimator,
    estimator_key: Option<(QueryShape, u32)>,
    snapshot: Option<Snapshot>,
}

impl WindowedListController {
    pub fn new(collection: impl Into<String>, query: ListQuery, settings: ListSettings) -> Self {
        Self {
            collection: collection.into(),
            settings,
            query,
            state: ListWindowState::default(),
            estimator: TotalEstimator::new(),
            estimator_key: None,
            snapshot: None,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn view(&self) -> &ListWindowState {
        &self.state
    }

    /// Replaces the current query and decides how to serve it.
    #[instrument(skip(self, query), fields(collection = %self.collection, query = %query))]
    pub fn set_query(&mut self, query: ListQuery) -> QueryPlan {
        self.query = query;

        let Some(sort) = self.query.sort().cloned() else {
            self.state.mode = ListMode::ServerPaginated;
            self.snapshot = None;
            self.state.snapshot_truncated = false;
            let key = (self.query.shape(), self.query.page_size());
            if self.estimator_key.as_ref() != Some(&key) {
                self.estimator.reset();
                self.estimator_key = Some(key);
            }
            return QueryPlan::Fetch(self.issue());
        };

        self.state.mode = ListMode::ClientSortedSnapshot;
        let shape = self.query.shape();
        let reusable = self.state.in_flight.is_none()
            && self.snapshot.as_ref().is_some_and(|s| s.shape == shape);
        if reusable {
            self.resort(&sort);
            self.slice_snapshot();
            debug!("served from snapshot");
            return QueryPlan::Local;
        }
        self.snapshot = None;
        QueryPlan::Fetch(self.issue())
    }

    /// Re-fetches the current window after the backend reported a change.
    /// The held snapshot and the total estimate both describe the old data
    /// and are discarded.
    pub fn refresh(&mut self) -> FetchPlan {
        self.estimator.reset();
        self.refetch()
    }

    /// Resubmits the current query after a failure. The data set is assumed
    /// unchanged, so the total estimate is kept.
    pub fn retry(&mut self) -> FetchPlan {
        self.refetch()
    }

    /// Adopts new settings. A snapshot fetched under a different cap is
    /// dropped so the next query fetches it again; a sort policy change
    /// re-sorts the held snapshot in place.
    pub fn set_settings(&mut self, settings: ListSettings) {
        let cap_changed = settings.snapshot_cap != self.settings.snapshot_cap;
        let policy_changed = settings.sort_policy != self.settings.sort_policy;
        self.settings = settings;

        if cap_changed {
            debug!(snapshot_cap = self.settings.snapshot_cap, "snapshot cap changed");
            self.snapshot = None;
        } else if policy_changed {
            let policy = &self.settings.sort_policy;
            if let Some(snapshot) = self.snapshot.as_mut() {
                snapshot.sorted = policy.sorted(&snapshot.raw, &snapshot.sorted_by);
            }
            if self.state.mode == ListMode::ClientSortedSnapshot && self.state.in_flight.is_none() {
                self.slice_snapshot();
            }
        }
    }

    fn refetch(&mut self) -> FetchPlan {
        self.snapshot = None;
        self.issue()
    }

    /// Applies a fetch result if `token` is still the latest request.
    #[instrument(skip(self, result), fields(collection = %self.collection, %token))]
    pub fn apply(&mut self, token: RequestToken, result: FetchResult) -> ApplyOutcome {
        if self.state.in_flight != Some(token) {
            debug!("discarding stale response");
            return ApplyOutcome::Stale;
        }
        self.state.in_flight = None;
        self.state.loading = false;

        match result {
            Err(e) => {
                warn!(error = %e, "list fetch failed");
                self.state.error = Some(AppError::from(e));
                self.state.items.clear();
                self.state.has_more_hint = false;
                self.snapshot = None;
                ApplyOutcome::Failed
            }
            Ok(response) => {
                self.state.error = None;
                match self.state.mode {
                    ListMode::ServerPaginated => self.apply_page(response),
                    ListMode::ClientSortedSnapshot => self.apply_snapshot(response),
                }
                ApplyOutcome::Applied
            }
        }
    }

    fn issue(&mut self) -> FetchPlan {
        let token = RequestToken::generate();
        self.state.in_flight = Some(token);
        self.state.loading = true;

        let (skip, limit) = match self.state.mode {
            ListMode::ServerPaginated => (self.query.skip(), self.query.page_size()),
            ListMode::ClientSortedSnapshot => (0, self.settings.snapshot_cap),
        };
        let filters = self
            .query
            .filters()
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.clone(), v.clone())))
            .collect();
        let search = Some(self.query.search_text().to_owned()).filter(|s| !s.is_empty());

        FetchPlan {
            token,
            request: PageRequest {
                collection: self.collection.clone(),
                skip,
                limit,
                search,
                filters,
                // Snapshot mode sorts locally; the backend only pages.
                sort: None,
            },
        }
    }

    fn apply_page(&mut self, response: PageResponse) {
        let page_size = self.query.page_size();
        let mut items = response.items;
        items.truncate(page_size as usize);

        let observation = PageObservation {
            page_index: self.query.page_index(),
            page_size,
            item_count: items.len(),
            server_total: response.total,
            server_total_exact: response.total_exact,
            has_more: response.has_more,
        };
        let estimate = self.estimator.observe(observation);

        self.state.items = items;
        self.state.displayed_total = estimate.value;
        self.state.total_is_exact = estimate.exact;
        self.state.has_more_hint = self.estimator.has_more_after(&observation);
    }

    fn apply_snapshot(&mut self, response: PageResponse) {
        let Some(sort) = self.query.sort().cloned() else {
            return;
        };
        let cap = self.settings.snapshot_cap as usize;
        let mut raw = response.items;
        raw.truncate(cap);
        let truncated = raw.len() >= cap;
        let sorted = self.settings.sort_policy.sorted(&raw, &sort);

        self.snapshot = Some(Snapshot {
            shape: self.query.shape(),
            raw,
            sorted,
            sorted_by: sort,
            truncated,
        });
        self.slice_snapshot();
    }

    fn resort(&mut self, sort: &SortSpec) {
        let policy = &self.settings.sort_policy;
        if let Some(snapshot) = self.snapshot.as_mut() {
            if &snapshot.sorted_by != sort {
                snapshot.sorted = policy.sorted(&snapshot.raw, sort);
                snapshot.sorted_by = sort.clone();
            }
        }
    }

    fn slice_snapshot(&mut self) {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return;
        };
        let len = snapshot.sorted.len();
        let start = usize::try_from(self.query.skip()).map_or(len, |s| s.min(len));
        let end = start
            .saturating_add(self.query.page_size() as usize)
            .min(len);

        self.state.items = snapshot.sorted[start..end].to_vec();
        self.state.displayed_total = len as u64;
        self.state.total_is_exact = true;
        self.state.has_more_hint = end < len;
        self.state.snapshot_truncated = snapshot.truncated;
        self.state.error = None;
    }
}

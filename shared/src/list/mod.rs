//! Windowed list synchronization: queries, paging, client-side sort and
//! total-count estimation for one list screen.

mod controller;
mod debounce;
mod page;
mod query;
mod record;
mod sort;
mod total;

pub use self::controller::{
    ApplyOutcome, FetchPlan, ListMode, ListSettings, ListWindowState, QueryPlan, RequestToken,
    WindowedListController,
};
pub use self::debounce::{DebounceTicket, Debouncer};
pub use self::page::{FetchError, FetchResult, PageRequest, PageResponse};
pub use self::query::{Filters, ListQuery, QueryChange, QueryError, QueryShape, SortDirection, SortSpec};
pub use self::record::Record;
pub use self::sort::{duration_minutes, SortPolicy};
pub use self::total::{PageObservation, TotalEstimate, TotalEstimator};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Wire token: `column` ascending, `-column` descending.
    #[must_use]
    pub fn token(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.column.clone(),
            SortDirection::Desc => format!("-{}", self.column),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("page index must be >= 1, got {0}")]
    InvalidPageIndex(u32),
    #[error("page size must be > 0")]
    InvalidPageSize,
}

/// Filter values keyed by field. A key maps to one or more values, sent as
/// repeated `key=value` pairs.
pub type Filters = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    page_index: u32,
    page_size: u32,
    search_text: String,
    filters: Filters,
    sort: Option<SortSpec>,
}

/// The part of a query that decides which records exist, ignoring paging
/// and ordering. Two queries with the same shape see the same record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryShape {
    search_text: String,
    filters: Filters,
}

impl ListQuery {
    pub fn new(page_index: u32, page_size: u32) -> Result<Self, QueryError> {
        if page_index == 0 {
            return Err(QueryError::InvalidPageIndex(page_index));
        }
        if page_size == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        Ok(Self {
            page_index,
            page_size,
            search_text: String::new(),
            filters: Filters::new(),
            sort: None,
        })
    }

    /// First page of `page_size` with no search, filter or sort.
    pub fn first_page(page_size: u32) -> Result<Self, QueryError> {
        Self::new(1, page_size)
    }

    #[must_use]
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.entry(key.into()).or_default().push(value.into());
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Offset of the first record on the current page.
    #[must_use]
    pub fn skip(&self) -> u64 {
        u64::from(self.page_index - 1) * u64::from(self.page_size)
    }

    #[must_use]
    pub fn shape(&self) -> QueryShape {
        QueryShape {
            search_text: self.search_text.clone(),
            filters: self.filters.clone(),
        }
    }

    /// Produces the query that results from one user edit. Every change other
    /// than an explicit page jump sends the user back to the first page.
    pub fn apply(&self, change: QueryChange) -> Result<Self, QueryError> {
        let mut next = self.clone();
        match change {
            QueryChange::Page(index) => {
                if index == 0 {
                    return Err(QueryError::InvalidPageIndex(index));
                }
                next.page_index = index;
                return Ok(next);
            }
            QueryChange::PageSize(size) => {
                if size == 0 {
                    return Err(QueryError::InvalidPageSize);
                }
                next.page_size = size;
            }
            QueryChange::Search(text) => next.search_text = text,
            QueryChange::SetFilter { key, values } => {
                if values.is_empty() {
                    next.filters.remove(&key);
                } else {
                    next.filters.insert(key, values);
                }
            }
            QueryChange::ClearFilters => next.filters.clear(),
            QueryChange::Sort(sort) => next.sort = sort,
            QueryChange::ToggleSort { column } => {
                next.sort = match next.sort.take() {
                    Some(current) if current.column == column => Some(SortSpec {
                        column,
                        direction: current.direction.flipped(),
                    }),
                    _ => Some(SortSpec::new(column, SortDirection::Asc)),
                };
            }
        }
        next.page_index = 1;
        Ok(next)
    }
}

impl fmt::Display for ListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} x {}", self.page_index, self.page_size)?;
        if !self.search_text.is_empty() {
            write!(f, " search={:?}", self.search_text)?;
        }
        if let Some(sort) = &self.sort {
            write!(f, " sort={}", sort.token())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryChange {
    Page(u32),
    PageSize(u32),
    Search(String),
    SetFilter { key: String, values: Vec<String> },
    ClearFilters,
    Sort(Option<SortSpec>),
    ToggleSort { column: String },
}

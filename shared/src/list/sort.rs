//! Client-side ordering for sorted snapshots.
//!
//! The backend cannot sort by arbitrary columns, so a sorted view is built by
//! sorting the whole fetched snapshot here. The comparator policy:
//!
//! * missing and `null` values sort as the empty string,
//! * booleans order `false < true`,
//! * duration columns parse `<number> minutes` numerically (unparseable is 0),
//! * everything else compares as case-insensitive text.
//!
//! The sort is stable in both directions: ties keep their input order.

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::LazyLock;

use super::query::{SortDirection, SortSpec};
use super::record::Record;

static DURATION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*min(?:ute)?s?\s*$").ok());

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortPolicy {
    duration_columns: Vec<String>,
}

impl SortPolicy {
    pub fn new(duration_columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            duration_columns: duration_columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_duration_column(&self, column: &str) -> bool {
        self.duration_columns.iter().any(|c| c == column)
    }

    fn key_for(&self, record: &Record, column: &str) -> SortKey {
        let value = record.field(column);
        if self.is_duration_column(column) {
            return SortKey::Number(duration_minutes(value));
        }
        match value {
            None | Some(Value::Null) => SortKey::Text(String::new()),
            Some(Value::Bool(b)) => SortKey::Bool(*b),
            Some(Value::String(s)) => SortKey::Text(s.to_lowercase()),
            Some(other) => SortKey::Text(other.to_string().to_lowercase()),
        }
    }

    /// Sorts `records` in place by `sort`. Stable.
    pub fn sort(&self, records: &mut Vec<Record>, sort: &SortSpec) {
        let mut keyed: Vec<(SortKey, Record)> = records
            .drain(..)
            .map(|r| (self.key_for(&r, &sort.column), r))
            .collect();
        match sort.direction {
            SortDirection::Asc => keyed.sort_by(|a, b| a.0.compare(&b.0)),
            SortDirection::Desc => keyed.sort_by(|a, b| b.0.compare(&a.0)),
        }
        records.extend(keyed.into_iter().map(|(_, r)| r));
    }

    /// Returns a sorted copy of `records`, leaving the input untouched.
    #[must_use]
    pub fn sorted(&self, records: &[Record], sort: &SortSpec) -> Vec<Record> {
        let mut out = records.to_vec();
        self.sort(&mut out, sort);
        out
    }
}

/// Minutes parsed from a duration cell. Numbers are taken as-is.
#[must_use]
pub fn duration_minutes(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => DURATION_PATTERN
            .as_ref()
            .and_then(|re| re.captures(s))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        _ => None,
    };
    parsed.filter(|m| m.is_finite()).unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            // Mixed kinds fall back to their text form.
            (a, b) => a.as_text().cmp(&b.as_text()),
        }
    }

    fn as_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

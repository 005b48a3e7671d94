use serde::{Deserialize, Serialize};

/// Best-effort record count for a query shape.
///
/// While `exact` is false, `value` is a lower bound: the list has at least
/// that many records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TotalEstimate {
    pub value: u64,
    pub exact: bool,
}

impl TotalEstimate {
    #[must_use]
    pub const fn exact(value: u64) -> Self {
        Self { value, exact: true }
    }

    #[must_use]
    pub const fn at_least(value: u64) -> Self {
        Self {
            value,
            exact: false,
        }
    }

    /// `"24"` when exact, `"11+"` when only a lower bound is known.
    #[must_use]
    pub fn label(&self) -> String {
        if self.exact {
            self.value.to_string()
        } else {
            format!("{}+", self.value)
        }
    }
}

/// What one page response told us about the size of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageObservation {
    pub page_index: u32,
    pub page_size: u32,
    pub item_count: usize,
    pub server_total: Option<u64>,
    pub server_total_exact: bool,
    pub has_more: Option<bool>,
}

impl PageObservation {
    fn visible_end(&self) -> u64 {
        u64::from(self.page_index.saturating_sub(1)) * u64::from(self.page_size)
            + self.item_count as u64
    }

    fn is_short(&self) -> bool {
        (self.item_count as u64) < u64::from(self.page_size)
    }
}

/// Folds page responses for one query shape into a [`TotalEstimate`].
///
/// The estimate never decreases while inexact, flips to exact as soon as the
/// end of the list is observed, and once exact stays exact until
/// [`TotalEstimator::reset`].
#[derive(Debug, Clone, Default)]
pub struct TotalEstimator {
    current: Option<TotalEstimate>,
}

impl TotalEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn observe(&mut self, page: PageObservation) -> TotalEstimate {
        let previous = self.current;
        let visible_end = page.visible_end();

        let next = if page.is_short() {
            if page.item_count == 0 && page.page_index > 1 {
                // Past the end: the total is at most what precedes this page.
                match previous {
                    Some(prev) if prev.exact => TotalEstimate::exact(prev.value.min(visible_end)),
                    _ => TotalEstimate::exact(visible_end),
                }
            } else {
                TotalEstimate::exact(visible_end)
            }
        } else if let (true, Some(total)) = (page.server_total_exact, page.server_total) {
            TotalEstimate::exact(total.max(visible_end))
        } else if page.has_more == Some(false) {
            TotalEstimate::exact(visible_end)
        } else {
            match previous {
                Some(prev) if prev.exact => TotalEstimate::exact(prev.value.max(visible_end)),
                _ => {
                    let floor = previous.map_or(0, |p| p.value);
                    let hint = page.server_total.unwrap_or(0);
                    TotalEstimate::at_least(floor.max(hint).max(visible_end + 1))
                }
            }
        };

        self.current = Some(next);
        next
    }

    /// Whether records exist beyond the page just observed.
    #[must_use]
    pub fn has_more_after(&self, page: &PageObservation) -> bool {
        match self.current {
            Some(estimate) if estimate.exact => page.visible_end() < estimate.value,
            Some(_) => !page.is_short(),
            None => false,
        }
    }
}

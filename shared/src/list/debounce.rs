use serde::{Deserialize, Serialize};

/// Identifies one armed debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DebounceTicket(u64);

/// Coalesces rapid input into a single settled value.
///
/// Every [`push`](Debouncer::push) supersedes the previous pending value and
/// returns a fresh ticket; the caller arms a timer for that ticket. When a
/// timer fires, [`settle`](Debouncer::settle) only yields the value if the
/// ticket is still the latest one.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    next: u64,
    pending: Option<(DebounceTicket, T)>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self {
            next: 0,
            pending: None,
        }
    }
}

impl<T> Debouncer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: T) -> DebounceTicket {
        self.next += 1;
        let ticket = DebounceTicket(self.next);
        self.pending = Some((ticket, value));
        ticket
    }

    pub fn settle(&mut self, ticket: DebounceTicket) -> Option<T> {
        match self.pending.take() {
            Some((latest, value)) if latest == ticket => Some(value),
            other => {
                self.pending = other;
                None
            }
        }
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(_, v)| v)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

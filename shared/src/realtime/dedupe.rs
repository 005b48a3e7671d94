use lru::LruCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::event::UnixTimeMs;

/// Natural identity of a pushed notification, e.g. `record-created:c-42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationIdentity(String);

impl NotificationIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the identity from the first id field present in `payload`.
    /// Payloads without any id field have no identity and are never
    /// suppressed.
    pub fn from_payload(topic: &str, payload: Option<&Value>, id_fields: &[String]) -> Option<Self> {
        let object = payload?.as_object()?;
        id_fields.iter().find_map(|field| {
            let id = match object.get(field)? {
                Value::String(s) if !s.is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(Self(format!("{topic}:{id}")))
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle of the eviction timer armed when an entry was inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupeEntry {
    pub seen_at: UnixTimeMs,
    pub expires_at: UnixTimeMs,
    pub timer: TimerHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    /// Seen within the horizon; do not surface.
    Duplicate,
    /// First sighting. The caller should arm `timer` to fire at `expires_at`.
    New {
        timer: TimerHandle,
        expires_at: UnixTimeMs,
    },
}

/// Time-bounded "seen" set for push notifications.
///
/// Each insertion arms exactly one eviction timer for `seen_at + horizon`.
/// Re-sighting a key before then is a no-op and does not extend the window.
/// Entries are never promoted, so the cache's LRU order is insertion order
/// and due timers can be drained from its tail.
pub struct DedupeCache {
    horizon_ms: u64,
    next_timer: u64,
    entries: LruCache<NotificationIdentity, DedupeEntry>,
    timers: HashMap<TimerHandle, NotificationIdentity>,
}

impl fmt::Debug for DedupeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupeCache")
            .field("horizon_ms", &self.horizon_ms)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl Default for DedupeCache {
    fn default() -> Self {
        Self::new(crate::DEFAULT_DEDUPE_HORIZON_MS)
    }
}

impl DedupeCache {
    pub fn new(horizon_ms: u64) -> Self {
        Self {
            horizon_ms,
            next_timer: 0,
            entries: LruCache::unbounded(),
            timers: HashMap::new(),
        }
    }

    pub fn horizon_ms(&self) -> u64 {
        self.horizon_ms
    }

    /// Changes the horizon for future sightings. Entries already held keep
    /// their expiry, and their armed timers stay valid because handles are
    /// never reused.
    pub fn set_horizon(&mut self, horizon_ms: u64) {
        if horizon_ms != self.horizon_ms {
            debug!(from = self.horizon_ms, to = horizon_ms, "dedupe horizon changed");
            self.horizon_ms = horizon_ms;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &NotificationIdentity) -> bool {
        self.entries.contains(key)
    }

    /// `true` if `key` was seen within the horizon. Otherwise records the
    /// sighting and returns `false`.
    pub fn should_suppress(&mut self, key: NotificationIdentity, now: UnixTimeMs) -> bool {
        matches!(self.check(key, now), Sighting::Duplicate)
    }

    pub fn check(&mut self, key: NotificationIdentity, now: UnixTimeMs) -> Sighting {
        self.expire_due(now);

        if let Some(entry) = self.entries.peek(&key).copied() {
            if now.is_before(entry.expires_at) {
                return Sighting::Duplicate;
            }
            // Expired but queued behind a younger entry (clock went backwards).
            self.remove(&key, entry.timer);
        }

        self.next_timer += 1;
        let timer = TimerHandle(self.next_timer);
        let expires_at = now.add_millis(self.horizon_ms);
        self.timers.insert(timer, key.clone());
        self.entries.put(
            key,
            DedupeEntry {
                seen_at: now,
                expires_at,
                timer,
            },
        );
        Sighting::New { timer, expires_at }
    }

    /// Fires one eviction timer. Returns `false` if the timer is unknown or
    /// its entry was already evicted.
    pub fn expire(&mut self, timer: TimerHandle) -> bool {
        let Some(key) = self.timers.get(&timer).cloned() else {
            return false;
        };
        self.remove(&key, timer)
    }

    /// Fires every timer due at `now`. Returns how many entries were evicted.
    pub fn expire_due(&mut self, now: UnixTimeMs) -> usize {
        let mut evicted = 0;
        while let Some((_, entry)) = self.entries.peek_lru() {
            if now.is_before(entry.expires_at) {
                break;
            }
            if let Some((key, entry)) = self.entries.pop_lru() {
                self.timers.remove(&entry.timer);
                debug!(key = %key, "dedupe entry expired");
                evicted += 1;
            }
        }
        evicted
    }

    fn remove(&mut self, key: &NotificationIdentity, timer: TimerHandle) -> bool {
        match self.entries.peek(key) {
            Some(entry) if entry.timer == timer => {
                self.entries.pop(key);
                self.timers.remove(&timer);
                debug!(key = %key, "dedupe entry expired");
                true
            }
            _ => {
                self.timers.remove(&timer);
                false
            }
        }
    }
}

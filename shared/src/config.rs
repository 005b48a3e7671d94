use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::list::{ListSettings, SortPolicy};
use crate::{
    DEFAULT_DEDUPE_HORIZON_MS, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_DEBOUNCE_MS,
    DEFAULT_SNAPSHOT_CAP, DEFAULT_TOAST_DURATION_MS, MAX_SNAPSHOT_CAP,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Validation(String),
    #[error("could not parse configuration: {0}")]
    Parse(String),
}

/// Tunables for the core. The shell sends one with [`Event::Configure`];
/// until then the defaults apply.
///
/// [`Event::Configure`]: crate::Event::Configure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Upper bound on records fetched for a client-sorted snapshot.
    pub snapshot_cap: u32,
    pub search_debounce_ms: u64,
    pub dedupe_horizon_ms: u64,
    pub default_page_size: u32,
    /// Columns holding `<number> minutes` text, compared numerically.
    pub duration_columns: Vec<String>,
    /// Payload fields tried in order for a notification's identity.
    pub identity_fields: Vec<String>,
    pub toast_duration_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            snapshot_cap: DEFAULT_SNAPSHOT_CAP,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            dedupe_horizon_ms: DEFAULT_DEDUPE_HORIZON_MS,
            default_page_size: DEFAULT_PAGE_SIZE,
            duration_columns: vec!["Duration".into(), "duration".into()],
            identity_fields: vec![
                "conversation_id".into(),
                "record_id".into(),
                "id".into(),
            ],
            toast_duration_ms: DEFAULT_TOAST_DURATION_MS,
        }
    }
}

impl CoreConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot_cap == 0 {
            return Err(ConfigError::Validation("snapshot_cap must be > 0".into()));
        }
        if self.snapshot_cap > MAX_SNAPSHOT_CAP {
            return Err(ConfigError::Validation(format!(
                "snapshot_cap must be <= {MAX_SNAPSHOT_CAP}"
            )));
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::Validation("default_page_size must be > 0".into()));
        }
        if self.default_page_size > self.snapshot_cap {
            return Err(ConfigError::Validation(
                "default_page_size cannot exceed snapshot_cap".into(),
            ));
        }
        if self.dedupe_horizon_ms == 0 {
            return Err(ConfigError::Validation("dedupe_horizon_ms must be > 0".into()));
        }
        if self.identity_fields.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(
                "identity_fields cannot contain empty names".into(),
            ));
        }
        Ok(())
    }

    /// Settings handed to each screen's list controller.
    #[must_use]
    pub fn list_settings(&self) -> ListSettings {
        ListSettings {
            snapshot_cap: self.snapshot_cap,
            sort_policy: SortPolicy::new(self.duration_columns.iter().cloned()),
        }
    }
}

// lib.rs - List synchronization core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod list;
pub mod model;
pub mod playback;
pub mod realtime;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{ConfigError, CoreConfig};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::{Event, ItemId, ScreenId, UnixTimeMs};
pub use model::{Model, PlaybackView, ScreenView, ToastKind, ToastView, ViewModel};

pub const DEFAULT_SNAPSHOT_CAP: u32 = 1000;
pub const MAX_SNAPSHOT_CAP: u32 = 10_000;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 400;
pub const DEFAULT_DEDUPE_HORIZON_MS: u64 = 30_000;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Deserialization,
    Playback,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Playback => "PLAYBACK_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network
            | Self::Timeout
            | Self::Conflict
            | Self::RateLimited
            | Self::Playback
            | Self::Internal => ErrorSeverity::Transient,

            Self::Deserialization | Self::InvalidState => ErrorSeverity::Fatal,

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    /// Whether repeating the same user action may succeed. A list fetch can
    /// always be retried from the error banner; this drives the hint only.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network
                | Self::Timeout
                | Self::RateLimited
                | Self::Conflict
                | Self::Playback
                | Self::Internal
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Authentication => "Your session has expired. Please sign in again.".into(),
            ErrorKind::Authorization => "You don't have permission to view this list.".into(),
            ErrorKind::Validation | ErrorKind::Playback => self.message.clone(),
            ErrorKind::NotFound => "The requested list could not be found.".into(),
            ErrorKind::Conflict => {
                "This list changed while loading. Please try again.".into()
            }
            ErrorKind::RateLimited => {
                "Too many requests. Please wait a moment and try again.".into()
            }
            ErrorKind::Deserialization => {
                "The server sent data we could not read. Please contact support if this persists."
                    .into()
            }
            ErrorKind::InvalidState => {
                "The app is in an invalid state. Please reload the page.".into()
            }
            ErrorKind::Internal | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, message: &str) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            408 | 504 => ErrorKind::Timeout,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        let message = if message.is_empty() {
            format!("HTTP error: {status}")
        } else {
            message.to_owned()
        };

        Self::new(kind, message).with_context("http_status", status.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<list::FetchError> for AppError {
    fn from(e: list::FetchError) -> Self {
        match e {
            list::FetchError::Network { message } => {
                AppError::new(ErrorKind::Network, "Network request failed").with_internal(message)
            }
            list::FetchError::Timeout => AppError::new(ErrorKind::Timeout, "Request timed out"),
            list::FetchError::Status { status, message } => {
                AppError::from_http_status(status, &message)
            }
            list::FetchError::Decode { message } => {
                AppError::new(ErrorKind::Deserialization, "Malformed list response")
                    .with_internal(message)
            }
        }
    }
}

impl From<list::QueryError> for AppError {
    fn from(e: list::QueryError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<playback::PlaybackError> for AppError {
    fn from(e: playback::PlaybackError) -> Self {
        let message = match &e {
            playback::PlaybackError::StartFailed { .. } => "Could not play this recording.",
            playback::PlaybackError::Media { .. } => "Playback stopped unexpectedly.",
        };
        AppError::new(ErrorKind::Playback, message)
            .with_internal(e.to_string())
            .with_context("item", e.item().as_str())
    }
}

/// Error as the shell shows it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::FetchError;

    #[test]
    fn network_failure_is_retryable_and_transient() {
        let err = AppError::from(FetchError::network("connection reset"));
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.is_retryable());
        assert_eq!(err.internal_message.as_deref(), Some("connection reset"));

        let view = UserFacingError::from(&err);
        assert!(view.is_transient);
        assert_eq!(view.error_code, "NETWORK_ERROR");
    }

    #[test]
    fn http_status_maps_to_kind() {
        let err = AppError::from(FetchError::Status {
            status: 503,
            message: String::new(),
        });
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.message, "HTTP error: 503");
        assert_eq!(err.context.get("http_status").map(String::as_str), Some("503"));

        assert_eq!(AppError::from_http_status(401, "expired").kind, ErrorKind::Authentication);
        assert_eq!(AppError::from_http_status(404, "").kind, ErrorKind::NotFound);
        assert_eq!(AppError::from_http_status(418, "").kind, ErrorKind::Unknown);
    }

    #[test]
    fn decode_failure_is_fatal_and_not_retryable() {
        let err = AppError::from(FetchError::Decode {
            message: "expected array".into(),
        });
        assert_eq!(err.severity, ErrorSeverity::Fatal);
        assert!(!err.is_retryable());
    }

    #[test]
    fn rate_limited_status_asks_user_to_wait() {
        let err = AppError::from_http_status(429, "slow down");
        assert!(err.is_retryable());
        assert!(err.user_facing_message().contains("wait a moment"));
    }

    #[test]
    fn display_includes_code_and_internal() {
        let err = AppError::new(ErrorKind::Timeout, "Request timed out").with_internal("30s");
        assert_eq!(err.to_string(), "[TIMEOUT] Request timed out (internal: 30s)");
    }
}

//! Shared primitives for all Rust crates in chainaudit.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across chainaudit crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// One or more required input fields are missing or invalid.
    #[error("missing or invalid fields: {}", .0.join(", "))]
    InvalidFields(Vec<String>),

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The ledger already holds an entry for this event identifier.
    #[error("duplicate event: {0}")]
    DuplicateEvent(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failed in a way that may succeed on a later attempt.
    #[error("transient storage error: {0}")]
    TransientStorage(String),

    /// A broken link was found in the hash chain.
    #[error("chain integrity violation: {0}")]
    ChainIntegrity(String),

    /// A downstream pipeline stage could not be reached or timed out.
    #[error("downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// Caller exceeded the configured request budget.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether repeating the failed operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientStorage(_) | Self::DownstreamUnavailable(_)
        )
    }

    /// Returns a stable machine-readable name for the error category.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFields(_) => "invalid_fields",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::DuplicateEvent(_) => "duplicate_event",
            Self::Conflict(_) => "conflict",
            Self::TransientStorage(_) => "transient_storage",
            Self::ChainIntegrity(_) => "chain_integrity",
            Self::DownstreamUnavailable(_) => "downstream_unavailable",
            Self::RateLimited(_) => "rate_limited",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn only_storage_and_downstream_failures_are_retryable() {
        assert!(AppError::TransientStorage("reset".to_owned()).is_retryable());
        assert!(AppError::DownstreamUnavailable("timeout".to_owned()).is_retryable());
        assert!(!AppError::ChainIntegrity("broken".to_owned()).is_retryable());
        assert!(!AppError::DuplicateEvent("evt".to_owned()).is_retryable());
        assert!(!AppError::InvalidFields(vec!["eventId".to_owned()]).is_retryable());
        assert!(!AppError::Internal("boom".to_owned()).is_retryable());
    }

    #[test]
    fn invalid_fields_message_lists_every_field() {
        let error = AppError::InvalidFields(vec!["eventId".to_owned(), "type".to_owned()]);
        assert_eq!(
            error.to_string(),
            "missing or invalid fields: eventId, type"
        );
    }
}

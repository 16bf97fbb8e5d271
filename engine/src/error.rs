//! Error types for the Staybook engine.

use crate::BookingStatus;
use thiserror::Error;

/// All possible errors from the Staybook engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Remote store errors
    #[error("network error: {0}")]
    Network(String),

    #[error("remote store did not answer in time")]
    NetworkTimeout,

    #[error("remote store reported no effect")]
    NoEffect,

    #[error("not found: {0}")]
    NotFound(String),

    // Caller errors
    #[error("operation requires a signed-in owner")]
    NotAuthenticated,

    #[error("invalid booking draft: {0}")]
    InvalidDraft(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::NetworkTimeout
        } else {
            Error::Network(err.to_string())
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::NotFound("booking b-1".into());
        assert_eq!(err.to_string(), "not found: booking b-1");

        let err = Error::InvalidTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition: Cancelled -> Completed"
        );

        assert_eq!(
            Error::NotAuthenticated.to_string(),
            "operation requires a signed-in owner"
        );
    }
}

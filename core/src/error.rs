//! Error taxonomy shared by the service and both transports.
//!
//! Every failure a caller can observe is one of four kinds. Storage failures
//! become [`TicketError::Internal`] inside the storage adapter; transports map
//! the kinds to status codes exactly once.

use crate::ticket::TicketId;
use thiserror::Error;

/// Result alias used throughout the ticket history crates.
pub type Result<T> = std::result::Result<T, TicketError>;

/// Errors returned by ticket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// Malformed or disallowed request shape
    #[error("{0}")]
    InvalidInput(String),

    /// No ticket exists for the identifier
    #[error("ticket not found: {0}")]
    NotFound(TicketId),

    /// Caller is not allowed to perform the operation
    #[error("{0}")]
    PermissionDenied(String),

    /// Storage or unexpected failure (detail is for logs only)
    #[error("internal error: {0}")]
    Internal(String),
}

impl TicketError {
    /// Create an [`TicketError::InvalidInput`] error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a [`TicketError::PermissionDenied`] error.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Create an [`TicketError::Internal`] error.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// Stable, machine-readable kind for this error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keeps_caller_message() {
        let err = TicketError::invalid_input("no changes provided");
        assert_eq!(err.to_string(), "no changes provided");
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn not_found_names_the_identifier() {
        let err = TicketError::NotFound(TicketId::new(42));
        assert_eq!(err.to_string(), "ticket not found: 42");
        assert_eq!(err.kind(), "not_found");
    }
}

//! Error types for access resolution
//!
//! This module defines the errors that cross the engine boundary. Access
//! denial is deliberately absent: a denied check is an ordinary outcome
//! (an empty bitmask or `None`), not a failure.

use thiserror::Error;

use crate::settings::ConfigError;

/// Storage collaborator failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A query was rejected by the store
    #[error("Query failed: {0}")]
    Query(String),

    /// A stored row could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    Corrupt {
        /// Table the row came from
        table: String,
        /// Decoding failure
        message: String,
    },
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to callers of the access engine.
///
/// Only programming errors upstream (`Unauthenticated`, `MissingOwnership`)
/// and collaborator failures are represented here.
#[derive(Debug, Error)]
pub enum AccessError {
    /// An operation needing a principal ran without one
    #[error("No authenticated principal in request context")]
    Unauthenticated,

    /// The record carries no ownership columns to compute permissions from
    #[error("Record {uid} of {table} has no ownership fields")]
    MissingOwnership {
        /// Table of the offending record
        table: String,
        /// Uid of the offending record
        uid: i64,
    },

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for access operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Check if this error indicates caller misuse rather than an
    /// infrastructure fault.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            AccessError::Unauthenticated | AccessError::MissingOwnership { .. }
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::Unauthenticated => "UNAUTHENTICATED",
            AccessError::MissingOwnership { .. } => "MISSING_OWNERSHIP",
            AccessError::Store(StoreError::Unavailable(_)) => "STORE_UNAVAILABLE",
            AccessError::Store(StoreError::Query(_)) => "STORE_QUERY_FAILED",
            AccessError::Store(StoreError::Corrupt { .. }) => "STORE_CORRUPT_ROW",
            AccessError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misuse_classification() {
        assert!(AccessError::Unauthenticated.is_misuse());
        assert!(AccessError::MissingOwnership {
            table: "sys_file".to_string(),
            uid: 3
        }
        .is_misuse());
        assert!(!AccessError::from(StoreError::Unavailable("down".to_string())).is_misuse());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AccessError::Unauthenticated.error_code(), "UNAUTHENTICATED");
        let err = AccessError::from(StoreError::Query("syntax".to_string()));
        assert_eq!(err.error_code(), "STORE_QUERY_FAILED");
        assert_eq!(err.to_string(), "Query failed: syntax");
    }
}

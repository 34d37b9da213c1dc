//! # Engine Error Type
//!
//! Unified error type for movement operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockbook                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  MovementEngine operation                                        │  │
//! │  │  Result<T, EngineError>                                          │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Rule violated? ─── CoreError::InsufficientStock ──┐             │  │
//! │  │         │                                          │             │  │
//! │  │         ▼                                          ▼             │  │
//! │  │  Store failed? ──── DbError::QueryFailed ─────► EngineError      │  │
//! │  │         │                                          │             │  │
//! │  │         │                                     .kind()            │  │
//! │  │         ▼                                          ▼             │  │
//! │  │  Success                          ErrorPayload { kind, message } │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  {                                                                      │
//! │    "kind": "INSUFFICIENT_STOCK",                                        │
//! │    "message": "Insufficient stock for Cola: available 3, requested 5"   │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use stockbook_core::{CoreError, ErrorKind, ValidationError};
use stockbook_db::DbError;
use thiserror::Error;

/// Error returned by every engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The store failed.
    #[error(transparent)]
    Storage(DbError),
}

impl EngineError {
    /// Returns the stable category of this error.
    ///
    /// Store-level not-found and uniqueness failures keep their meaning;
    /// everything else from the store is `Storage`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Domain(err) => err.kind(),
            EngineError::Storage(DbError::NotFound { .. }) => ErrorKind::NotFound,
            EngineError::Storage(DbError::UniqueViolation { .. }) => ErrorKind::InvalidInput,
            EngineError::Storage(DbError::StaleWrite { .. } | DbError::Busy(_)) => {
                ErrorKind::Conflict
            }
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether the failed attempt may succeed if re-run from a fresh read.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Storage(err) => err.is_retryable(),
            EngineError::Domain(_) => false,
        }
    }

    /// Serializable form for callers.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Converts database errors, lifting duplicate SKUs into a validation error.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { field, value } => {
                EngineError::Domain(CoreError::Validation(ValidationError::Duplicate {
                    field,
                    value,
                }))
            }
            DbError::NotFound { entity, id } => {
                tracing::debug!(entity = %entity, id = %id, "Store reported missing record");
                EngineError::Storage(DbError::NotFound { entity, id })
            }
            other => {
                if !other.is_retryable() {
                    tracing::error!(error = %other, "Database operation failed");
                }
                EngineError::Storage(other)
            }
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

/// Serialized shape of a failure.
///
/// ```json
/// {
///   "kind": "NOT_FOUND",
///   "message": "Product not found: 3f1c…"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Machine-readable category
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,
}

impl From<EngineError> for ErrorPayload {
    fn from(err: EngineError) -> Self {
        err.to_payload()
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let err: EngineError = CoreError::not_found("Product", "p-1").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retryable());

        let err: EngineError = DbError::stale("Product", "p-1").into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.is_retryable());

        let err: EngineError = DbError::QueryFailed("boom".into()).into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_duplicate_sku_is_invalid_input() {
        let err: EngineError = DbError::duplicate("products.sku", "COKE-330").into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("COKE-330"));
    }

    #[test]
    fn test_payload_serialization() {
        let err: EngineError = CoreError::InsufficientStock {
            product: "Cola".into(),
            available: 3,
            requested: 5,
        }
        .into();

        let json = serde_json::to_value(err.to_payload()).unwrap();
        assert_eq!(json["kind"], "INSUFFICIENT_STOCK");
        assert_eq!(
            json["message"],
            "Insufficient stock for Cola: available 3, requested 5"
        );
    }
}

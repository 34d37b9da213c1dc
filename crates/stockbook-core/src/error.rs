//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockbook-core errors (this file)                                     │
//! │  ├── CoreError        - Stock rule violations, missing records         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Stable discriminant callers map to a status    │
//! │                                                                         │
//! │  stockbook-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  stockbook-engine errors                                               │
//! │  └── EngineError      - CoreError | DbError, plus ErrorPayload         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// Stable, inspectable category of a failed movement.
///
/// The request layer maps these to transport statuses; the engine never
/// returns an error without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Referenced customer, product, sale or return is absent.
    NotFound,
    /// A decrement would drive stock negative.
    InsufficientStock,
    /// Malformed request: empty lines, non-positive quantity, blank reason,
    /// over-return.
    InvalidInput,
    /// The store is in a state that forbids the operation.
    InvalidState,
    /// Concurrent-write retries were exhausted.
    Conflict,
    /// Unexpected storage failure.
    Storage,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant maps to exactly one [`ErrorKind`] via [`CoreError::kind`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The product exists but is not part of the sale being returned against.
    #[error("Product {product_id} not in this sale ({sale_id})")]
    ProductNotInSale { sale_id: String, product_id: String },

    /// Insufficient stock to complete a decrement.
    ///
    /// ## User Workflow
    /// ```text
    /// createSale(lines: [COKE × 5])
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Coca-Cola", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A return asks for more than is still returnable on the sale.
    #[error(
        "Return quantity {requested} exceeds returnable quantity for product {product_id} \
         (sold {sold}, already returned {already_returned})"
    )]
    ReturnExceedsSold {
        product_id: String,
        sold: i64,
        already_returned: i64,
        requested: i64,
    },

    /// Reversing a return would drive stock negative.
    ///
    /// ## When This Occurs
    /// Stock was adjusted downward after the return was recorded, so the
    /// returned units are no longer on hand.
    #[error("Cannot reverse return {return_id}: product {product_id} has {on_hand} on hand, reversal needs {required}")]
    ReversalUnderflow {
        return_id: String,
        product_id: String,
        on_hand: i64,
        required: i64,
    },

    /// Sale is not in a state that allows the requested operation.
    #[error("Sale {sale_id} is {status}, cannot perform operation")]
    InvalidSaleStatus { sale_id: String, status: String },

    /// Compare-and-swap retries were exhausted.
    #[error("Concurrent update conflict on {entity} {id} after {attempts} attempts")]
    Conflict {
        entity: &'static str,
        id: String,
        attempts: u32,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } | CoreError::ProductNotInSale { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::ReturnExceedsSold { .. } | CoreError::Validation(_) => {
                ErrorKind::InvalidInput
            }
            CoreError::ReversalUnderflow { .. } | CoreError::InvalidSaleStatus { .. } => {
                ErrorKind::InvalidState
            }
            CoreError::Conflict { .. } => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a request doesn't meet requirements, before any
/// store is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad SKU characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Coca-Cola 330ml".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Coca-Cola 330ml: available 3, requested 5"
        );

        let err = CoreError::not_found("Customer", "c-1");
        assert_eq!(err.to_string(), "Customer not found: c-1");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CoreError::not_found("Sale", "s").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::ProductNotInSale {
                sale_id: "s".into(),
                product_id: "p".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::ReturnExceedsSold {
                product_id: "p".into(),
                sold: 2,
                already_returned: 1,
                requested: 2,
            }
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            CoreError::ReversalUnderflow {
                return_id: "r".into(),
                product_id: "p".into(),
                on_hand: 0,
                required: 1,
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            CoreError::Conflict {
                entity: "Product",
                id: "p".into(),
                attempts: 5
            }
            .kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}

//! # Store Errors
//!
//! `DbError` classifies what SQLite reported so the engine can tell a lost
//! race (retry) from a broken request (fail) from a broken store (log).
//!
//! ```text
//! sqlx::Error
//!    │
//!    ├── code 5/261/517, 6/262, "database is locked"  ─► Busy        ┐ retryable
//!    ├── CAS UPDATE matched 0 rows (repository)        ─► StaleWrite  ┘
//!    ├── "UNIQUE constraint failed: products.sku"      ─► UniqueViolation
//!    ├── "FOREIGN KEY constraint failed"               ─► ForeignKeyViolation
//!    ├── CHECK / append-only trigger / other SQL       ─► QueryFailed
//!    ├── PoolTimedOut                                   ─► PoolExhausted
//!    └── anything else                                  ─► Internal
//! ```

use thiserror::Error;

/// Primary and extended result codes for SQLITE_BUSY and SQLITE_LOCKED.
const SQLITE_BUSY_CODES: &[&str] = &["5", "261", "517", "6", "262"];

const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is `table.column` as SQLite names it.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A version-checked write matched no row: someone else committed first,
    /// or the quantity guard refused to go negative.
    #[error("Stale write to {entity} {id}")]
    StaleWrite { entity: String, id: String },

    /// Another connection holds the lock, or our snapshot is out of date.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Includes CHECK constraints and the ledger's append-only triggers.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn stale(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::StaleWrite {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether re-running the whole unit of work from a fresh read may
    /// succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::StaleWrite { .. } | DbError::Busy(_))
    }

    /// Attaches the offending value to a uniqueness failure.
    ///
    /// SQLite names the column but not the value; repositories know it.
    pub fn with_duplicate_value(self, value: impl Into<String>) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.into(),
            },
            other => other,
        }
    }
}

fn is_busy(code: Option<&str>, msg: &str) -> bool {
    code.map_or(false, |code| SQLITE_BUSY_CODES.contains(&code))
        || msg.contains("database is locked")
        || msg.contains("database table is locked")
}

/// Sorts a database-reported failure into a variant.
fn classify(code: Option<&str>, msg: &str) -> DbError {
    if is_busy(code, msg) {
        return DbError::Busy(msg.to_string());
    }

    if let Some(field) = msg.strip_prefix(UNIQUE_PREFIX) {
        return DbError::duplicate(field, "");
    }

    if msg.contains("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: msg.to_string(),
        };
    }

    DbError::QueryFailed(msg.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => classify(db_err.code().as_deref(), db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_detection() {
        assert!(is_busy(Some("5"), "database is locked"));
        assert!(is_busy(Some("517"), ""));
        assert!(is_busy(None, "database table is locked: products"));
        assert!(!is_busy(Some("19"), "UNIQUE constraint failed: products.sku"));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify(Some("2067"), "UNIQUE constraint failed: products.sku"),
            DbError::UniqueViolation { ref field, .. } if field == "products.sku"
        ));
        assert!(matches!(
            classify(Some("787"), "FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(
            classify(Some("1811"), "stock_log is append-only"),
            DbError::QueryFailed(_)
        ));
        assert!(matches!(classify(Some("261"), "busy"), DbError::Busy(_)));
    }

    #[test]
    fn test_duplicate_value_is_attached() {
        let err = classify(None, "UNIQUE constraint failed: products.sku")
            .with_duplicate_value("COKE-330");
        assert_eq!(
            err.to_string(),
            "Duplicate products.sku: 'COKE-330' already exists"
        );

        let untouched = DbError::PoolExhausted.with_duplicate_value("x");
        assert!(matches!(untouched, DbError::PoolExhausted));
    }

    #[test]
    fn test_retryable() {
        assert!(DbError::stale("Product", "p-1").is_retryable());
        assert!(DbError::Busy("database is locked".into()).is_retryable());
        assert!(!DbError::not_found("Product", "p-1").is_retryable());
        assert!(!DbError::PoolExhausted.is_retryable());
    }
}

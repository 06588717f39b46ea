//! Error types for quarry

use thiserror::Error;

/// Result type alias for quarry operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Error types for query construction, rendering and execution
#[derive(Debug, Error)]
pub enum QueryError {
    /// A construct that cannot be rendered for the active dialect
    #[error("Unsupported on {dialect}: {feature}")]
    Unsupported {
        dialect: &'static str,
        feature: String,
    },

    /// Builder state that cannot produce a valid statement
    #[error("Validation error: {0}")]
    Validation(String),

    /// Row/value decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Expected row was not returned
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement execution error reported by the backend
    #[error("Execution error: {0}")]
    Execution(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// A capability branch was reached that the negotiated backend can never
    /// serve. This is a programming error, not a runtime condition.
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Driver error from tokio-postgres
    #[cfg(feature = "postgres")]
    #[error("Backend error: {0}")]
    Backend(#[from] tokio_postgres::Error),
}

impl QueryError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an unsupported-dialect-feature error
    pub fn unsupported(dialect: &'static str, feature: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect,
            feature: feature.into(),
        }
    }

    /// Create a contract violation error
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract(message.into())
    }

    /// Check if this is an unsupported-dialect error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific QueryError
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Backend(err)
    }
}

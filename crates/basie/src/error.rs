//! Error types for basie

use thiserror::Error;

/// Result type alias for basie operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for mapping and database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Entity declaration or criteria reference metadata that does not exist or conflicts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An instance failed a local check before any statement was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation was attempted in a lifecycle state that forbids it.
    #[error("State error: {0}")]
    State(String),

    /// The execution engine reported a failure.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Failures surfaced by the execution engine, passed through unchanged.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Database connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("check constraint violation: {0}")]
    CheckViolation(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("pool error: {0}")]
    Pool(String),

    /// Any other engine failure
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wrap an engine failure that has no more specific kind.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::Other(message.into()))
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a state error
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Check if this error came from the execution engine
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::UniqueViolation(_)))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            let specific = match db_err.code().code() {
                "23505" => Some(ExecutionError::UniqueViolation(format!(
                    "{constraint}: {message}"
                ))),
                "23503" => Some(ExecutionError::ForeignKeyViolation(format!(
                    "{constraint}: {message}"
                ))),
                "23514" => Some(ExecutionError::CheckViolation(format!(
                    "{constraint}: {message}"
                ))),
                _ => None,
            };
            if let Some(specific) = specific {
                return Self::Execution(specific);
            }
        }
        if err.is_closed() {
            return Self::Execution(ExecutionError::Connection(err.to_string()));
        }
        Self::Execution(ExecutionError::Query(err))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Execution(ExecutionError::Pool(err.to_string()))
    }
}

use thiserror::Error;

/// Error type for dbtap operations.
///
/// The interception layer itself never manufactures errors: everything a
/// decorated connection returns originates in the wrapped driver or in a
/// configured replacement hook and is forwarded unchanged. The remaining
/// variants belong to the registry and the client layer.
#[derive(Debug, Error)]
pub enum DbTapError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("No driver registered under `{0}`")]
    UnknownDriver(String),

    #[error("A driver is already registered under `{0}`")]
    DuplicateDriver(String),

    #[error("Statement expects {expected} parameter(s), got {actual}")]
    ParameterCount { expected: usize, actual: usize },

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Result type alias for dbtap operations.
pub type Result<T> = std::result::Result<T, DbTapError>;

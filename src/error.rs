//! Error types for the trade store.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Query and decode failures carry the name of the stored procedure involved so a single
//! log line is enough to locate the failing call.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {variable} {reason}")]
    Configuration { variable: String, reason: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Procedure {procedure} failed: {message}")]
    Query {
        procedure: String,
        message: String,
        /// e.g., "42000" for a syntax or access violation
        sql_state: Option<String>,
    },

    #[error("Failed to decode row from {procedure}: {message}")]
    Decode { procedure: String, message: String },

    #[error("Lock file error: {path}: {message}")]
    LockFile { path: String, message: String },
}

impl StoreError {
    /// Create a configuration error for a missing or malformed value.
    pub fn configuration(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    /// Create an error for a required variable that is unset or empty.
    pub fn missing(variable: impl Into<String>) -> Self {
        Self::configuration(variable, "must be set")
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a query error from a driver error raised while invoking `procedure`.
    pub fn query(procedure: impl Into<String>, err: sqlx::Error) -> Self {
        let procedure = procedure.into();
        match err {
            sqlx::Error::Database(db_err) => Self::Query {
                procedure,
                message: db_err.message().to_string(),
                sql_state: db_err.code().map(|c| c.to_string()),
            },
            other => Self::Query {
                procedure,
                message: other.to_string(),
                sql_state: None,
            },
        }
    }

    /// Create a decode error for a row returned by `procedure`.
    pub fn decode(procedure: impl Into<String>, err: sqlx::Error) -> Self {
        let message = match err {
            sqlx::Error::ColumnDecode { index, source } => {
                format!("column {}: {}", index, source)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                format!("column index {} out of bounds (len: {})", index, len)
            }
            other => other.to_string(),
        };
        Self::Decode {
            procedure: procedure.into(),
            message,
        }
    }

    /// Create a lock file error.
    pub fn lock_file(path: impl Into<String>, err: std::io::Error) -> Self {
        Self::LockFile {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// True for procedure invocation failures, the ones the failure hook reports.
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Check if this error is retryable.
    ///
    /// The store never retries by itself; callers use this to decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            // MySQL server-side errors carry a SQLSTATE; client-side transport failures do not.
            Self::Query { sql_state, .. } => sql_state.is_none(),
            _ => false,
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

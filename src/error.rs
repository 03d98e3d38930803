//! Error types for the data-governance server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant maps to one failure category a caller can act on: bad input, an
//! unreachable database, an unsupported dialect, a missing row, a duplicate key,
//! a failed table setup, or a rejected classification.

use crate::classify::ClassifyError;
use crate::interchange::CsvError;
use serde::Serialize;
use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Oracle `ORA-00001: unique constraint violated`.
const ORA_UNIQUE_VIOLATION: i32 = 1;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Operation '{operation}' is not supported for database type {db_type}")]
    Unsupported { operation: String, db_type: String },

    #[error("Column with id '{id}' not found")]
    NotFound { id: String },

    #[error("A column record with id '{id}' already exists")]
    Duplicate { id: String },

    /// The connection itself succeeded; only table preparation failed.
    #[error("Connected to database, but failed to prepare table '{table}': {message}")]
    SchemaSetup { table: String, message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "23505" for Postgres or "ORA-00001" for Oracle
        code: Option<String>,
    },

    #[error("Classification failed: {0}")]
    Classification(#[from] ClassifyError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Machine-readable category of a [`CatalogError`], surfaced in result envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Connection,
    Unsupported,
    NotFound,
    Duplicate,
    SchemaSetup,
    Database,
    Classification,
    Internal,
}

impl CatalogError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an unsupported-dialect error.
    pub fn unsupported(operation: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            db_type: db_type.into(),
        }
    }

    /// Create a not-found error for a column record id.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a duplicate-key error for a column record id.
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::Duplicate { id: id.into() }
    }

    /// Create a table-setup error. The connection itself is known to be sound.
    pub fn schema_setup(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaSetup {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a database error with an optional driver error code.
    pub fn database(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Duplicate { .. } => ErrorKind::Duplicate,
            Self::SchemaSetup { .. } => ErrorKind::SchemaSetup,
            Self::Database { .. } => ErrorKind::Database,
            Self::Classification(_) => ErrorKind::Classification,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::SchemaSetup { .. } => {
                Some("Check that the database user may create tables, triggers and constraints")
            }
            _ => None,
        }
    }

    /// Re-label a driver error raised while preparing the table.
    ///
    /// Connection failures keep their kind; anything else becomes `SchemaSetup`
    /// so the caller knows the database was reachable.
    pub fn into_schema_setup(self, table: &str) -> Self {
        match self {
            Self::Connection { .. } | Self::SchemaSetup { .. } => self,
            Self::Database { message, .. } | Self::Internal { message } => {
                Self::schema_setup(table, message)
            }
            other => Self::schema_setup(table, other.to_string()),
        }
    }

    /// Map a driver error raised by an INSERT to a duplicate-key error when it
    /// is a uniqueness violation.
    pub fn on_insert(self, id: &str) -> Self {
        match &self {
            Self::Database {
                code: Some(code), ..
            } if code == PG_UNIQUE_VIOLATION || code == &ora_code(ORA_UNIQUE_VIOLATION) => {
                Self::duplicate(id)
            }
            _ => self,
        }
    }
}

fn ora_code(code: i32) -> String {
    format!("ORA-{:05}", code)
}

/// Convert sqlx errors to CatalogError.
impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => CatalogError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                CatalogError::database(db_err.message(), code)
            }
            sqlx::Error::PoolTimedOut => CatalogError::connection(
                "Timed out while connecting to the database",
                "Check network connectivity or raise --connect-timeout",
            ),
            sqlx::Error::PoolClosed => {
                CatalogError::connection("Connection pool is closed", "Retry the operation")
            }
            sqlx::Error::Io(io_err) => CatalogError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => CatalogError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => CatalogError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                CatalogError::internal(format!("Column not found in result: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                CatalogError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                CatalogError::internal(format!("Decode error: {}", source))
            }
            _ => CatalogError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert Oracle driver errors to CatalogError.
impl From<oracle::Error> for CatalogError {
    fn from(err: oracle::Error) -> Self {
        match err.db_error() {
            Some(db_err) => {
                let code = ora_code(db_err.code());
                // ORA-12xxx are listener / network errors, ORA-01017 is bad credentials
                if (12000..13000).contains(&db_err.code()) || db_err.code() == 1017 {
                    CatalogError::connection(
                        db_err.message().to_string(),
                        "Check the Oracle connect descriptor, listener and credentials",
                    )
                } else {
                    CatalogError::database(db_err.message().to_string(), Some(code))
                }
            }
            None => CatalogError::connection(
                err.to_string(),
                "Check that Oracle Instant Client is installed and reachable",
            ),
        }
    }
}

impl From<CsvError> for CatalogError {
    fn from(err: CsvError) -> Self {
        match err {
            CsvError::Write(message) => CatalogError::internal(message),
            other => CatalogError::invalid_input(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        CatalogError::internal(format!("Database worker failed: {}", err))
    }
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_unsupported_message_names_db_type() {
        let err = CatalogError::unsupported("fetch_columns", "hive");
        assert_eq!(
            err.to_string(),
            "Operation 'fetch_columns' is not supported for database type hive"
        );
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_postgres_unique_violation_becomes_duplicate() {
        let err = CatalogError::database("duplicate key", Some("23505".to_string()));
        let mapped = err.on_insert("id-1");
        assert_eq!(mapped.kind(), ErrorKind::Duplicate);
        assert!(mapped.to_string().contains("already exists"));
    }

    #[test]
    fn test_oracle_unique_violation_becomes_duplicate() {
        let err = CatalogError::database("unique constraint", Some("ORA-00001".to_string()));
        assert_eq!(err.on_insert("id-1").kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn test_other_database_errors_pass_through_on_insert() {
        let err = CatalogError::database("value too large", Some("22001".to_string()));
        assert_eq!(err.on_insert("id-1").kind(), ErrorKind::Database);
    }

    #[test]
    fn test_into_schema_setup_keeps_connection_errors() {
        let err = CatalogError::connection("refused", "retry");
        assert_eq!(err.into_schema_setup("t").kind(), ErrorKind::Connection);

        let err = CatalogError::database("permission denied for schema public", None);
        let mapped = err.into_schema_setup("t");
        assert_eq!(mapped.kind(), ErrorKind::SchemaSetup);
        assert!(mapped.to_string().starts_with("Connected to database"));
        assert!(mapped.suggestion().is_some());
    }

    #[test]
    fn test_csv_errors_are_input_errors() {
        let err: CatalogError = CsvError::MissingColumnName.into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_classification_error_kind() {
        let err: CatalogError = ClassifyError::EmptyResponse.into();
        assert_eq!(err.kind(), ErrorKind::Classification);
    }
}

//! Error types for DevLog.
//!
//! One enum covers request validation, pool availability and driver faults.
//! The HTTP layer maps each variant to a status code through [`ErrorKind`].

use thiserror::Error;
use tokio_postgres::error::SqlState;

use crate::models::Environment;

/// Main error type for DevLog operations.
#[derive(Debug, Error)]
pub enum DevlogError {
    /// Bad or missing request parameters, or an unknown environment.
    #[error("{message}")]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
    },

    /// The requested table does not exist in the catalog.
    #[error("table does not exist: {table}")]
    NotFound {
        /// Name of the missing table.
        table: String,
    },

    /// The environment has no pool (no connection string, or it was unusable).
    #[error("{} database is not connected", .env.as_str().to_uppercase())]
    Disconnected {
        /// Environment without a pool.
        env: Environment,
    },

    /// A transfer needs both pools and at least one is absent.
    #[error("database connections are incomplete")]
    IncompletePools,

    /// The server reported an error for a statement.
    #[error("{message}")]
    Query {
        /// PostgreSQL error message.
        message: String,
        /// Additional detail from PostgreSQL.
        detail: Option<String>,
        /// PostgreSQL hint.
        hint: Option<String>,
        /// Position in query (1-indexed).
        position: Option<usize>,
        /// SQLSTATE code (e.g., "23505").
        code: Option<String>,
    },

    /// A transfer could not proceed for a reason detected before touching data.
    #[error("{message}")]
    Transfer {
        /// Table being transferred.
        table: String,
        /// Human-readable error message.
        message: String,
    },

    /// The server could not be reached or the connection was lost.
    #[error("{message}")]
    Connection {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },
}

/// Coarse error classification used for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied something unusable (400).
    InvalidRequest,
    /// Referenced object is missing (404).
    NotFound,
    /// A required pool is absent (503).
    Unavailable,
    /// Database or transfer fault surfaced verbatim (400).
    Database,
    /// Server-side failure unrelated to the request (500).
    Internal,
}

impl DevlogError {
    // ========== Constructors ==========

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }

    /// Create a not-found error for a table.
    pub fn not_found(table: impl Into<String>) -> Self {
        Self::NotFound { table: table.into() }
    }

    /// Create a disconnected error for an environment.
    pub fn disconnected(env: Environment) -> Self {
        Self::Disconnected { env }
    }

    /// Create a query error carrying only a message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query { message: message.into(), detail: None, hint: None, position: None, code: None }
    }

    /// Create a transfer error.
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transfer { table: table.into(), message: message.into() }
    }

    /// Create a new connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    // ========== Methods ==========

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Disconnected { .. } | Self::IncompletePools => ErrorKind::Unavailable,
            Self::Query { .. } | Self::Transfer { .. } | Self::Connection { .. } => {
                ErrorKind::Database
            }
            Self::Config { .. } => ErrorKind::Internal,
        }
    }

    /// Get the SQLSTATE code (if applicable).
    pub fn pg_code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is a unique-key violation.
    pub fn is_unique_violation(&self) -> bool {
        self.pg_code() == Some(SqlState::UNIQUE_VIOLATION.code())
    }
}

// ========== Error Conversions ==========

/// Convert from tokio_postgres::Error to DevlogError.
impl From<tokio_postgres::Error> for DevlogError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let message = db_err.message().to_string();
            let code_str = db_err.code().code();

            // Connection exceptions (08xxx)
            if code_str.starts_with("08") {
                return DevlogError::Connection { message, source: Some(Box::new(err)) };
            }

            let position = db_err.position().and_then(|p| match p {
                tokio_postgres::error::ErrorPosition::Original(pos) => Some(*pos as usize),
                tokio_postgres::error::ErrorPosition::Internal { .. } => None,
            });

            return DevlogError::Query {
                message,
                detail: db_err.detail().map(String::from),
                hint: db_err.hint().map(String::from),
                position,
                code: Some(code_str.to_string()),
            };
        }

        if err.is_closed() {
            return DevlogError::Connection {
                message: "Connection closed".to_string(),
                source: Some(Box::new(err)),
            };
        }

        // Client-side failures (parameter encoding, row decoding) keep the driver message.
        DevlogError::query(err.to_string())
    }
}

/// Convert from a pool checkout failure.
impl From<deadpool_postgres::PoolError> for DevlogError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Backend(e) if e.as_db_error().is_some() => {
                DevlogError::from(e)
            }
            deadpool_postgres::PoolError::Backend(e) => DevlogError::Connection {
                message: format!("Failed to connect: {e}"),
                source: Some(Box::new(e)),
            },
            other => DevlogError::Connection {
                message: format!("Failed to acquire connection: {other}"),
                source: Some(Box::new(other)),
            },
        }
    }
}

/// Convert from toml::de::Error to DevlogError.
impl From<toml::de::Error> for DevlogError {
    fn from(err: toml::de::Error) -> Self {
        DevlogError::config(format!("invalid config file: {err}"))
    }
}

//! Error types for the SQL assistant.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Database and backend failures carry a short suggestion that the CLI and the web
//! application show next to the message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("LLM backend error: {message}")]
    Llm { message: String, suggestion: String },

    #[error("Training store error: {message}")]
    Store { message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("No database connected: {operation} requires connection parameters")]
    NotConnected { operation: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AssistantError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create an LLM backend error.
    pub fn llm(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_connected(operation: impl Into<String>) -> Self {
        Self::NotConnected {
            operation: operation.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::Llm { suggestion, .. } => Some(suggestion),
            Self::NotConnected { .. } => {
                Some("Pass --database-url or the --db-* options to connect to PostgreSQL")
            }
            _ => None,
        }
    }

    /// HTTP status used when the error is returned by the web application.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } | Self::NotConnected { .. } => StatusCode::BAD_REQUEST,
            Self::Database { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Connection { .. } | Self::Llm { .. } => StatusCode::BAD_GATEWAY,
            Self::Store { .. } | Self::Config { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert sqlx errors to AssistantError.
impl From<sqlx::Error> for AssistantError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => AssistantError::connection(
                msg.to_string(),
                "Check the connection parameters and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                AssistantError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => AssistantError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => AssistantError::connection(
                "Timed out acquiring a connection",
                "Check that the database is reachable",
            ),
            sqlx::Error::PoolClosed => AssistantError::connection(
                "Connection pool is closed",
                "Reopen the training store",
            ),
            sqlx::Error::Io(io_err) => AssistantError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => AssistantError::connection(
                format!("TLS error: {}", tls_err),
                "Build with a TLS feature or adjust sslmode",
            ),
            sqlx::Error::Protocol(msg) => AssistantError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                AssistantError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                AssistantError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                AssistantError::internal(format!("Decode error: {}", source))
            }
            _ => AssistantError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        let suggestion = if err.is_connect() {
            "Check that the LLM server is running and --base-url is correct"
        } else if err.is_timeout() {
            "The LLM server did not answer in time; try a smaller model"
        } else if err.is_decode() {
            "The server response is not OpenAI-compatible"
        } else {
            "Check the LLM backend configuration"
        };
        AssistantError::llm(err.to_string(), suggestion)
    }
}

/// Result type alias for assistant operations.
pub type AssistantResult<T> = Result<T, AssistantError>;

/// Web responses carry `{type: "error", error, suggestion?}`.
impl IntoResponse for AssistantError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "type": "error",
            "error": self.to_string(),
        });
        if let Some(suggestion) = self.suggestion() {
            body["suggestion"] = serde_json::Value::String(suggestion.to_string());
        }
        if let Self::Database {
            sql_state: Some(code),
            ..
        } = &self
        {
            body["sql_state"] = serde_json::Value::String(code.clone());
        }
        (self.status_code(), Json(body)).into_response()
    }
}

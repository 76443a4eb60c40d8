//! Error types for the ESL search core.
//!
//! Adapter-level failures are absorbed by the aggregator and reported as
//! partial results. Only input errors and total failures escape to callers.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the search core.
#[derive(Debug, Error)]
pub enum EslError {
    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Request errors
    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Search errors
    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Search failed for {entity}: {message}")]
    AdapterFailed { entity: String, message: String },

    #[error("Search unavailable: {message}")]
    SearchUnavailable { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, EslError>;

impl From<std::io::Error> for EslError {
    fn from(err: std::io::Error) -> Self {
        EslError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for EslError {
    fn from(err: serde_json::Error) -> Self {
        EslError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for EslError {
    fn from(err: rusqlite::Error) -> Self {
        EslError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl EslError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        EslError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for a validation error on a named request field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EslError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status code to report for this error.
    ///
    /// - 400: the request was malformed and nothing was executed
    /// - 500: the search subsystem failed as a whole
    pub fn http_status(&self) -> u16 {
        match self {
            EslError::InvalidParams { .. } | EslError::Validation { .. } => 400,
            _ => 500,
        }
    }

    /// Whether this error came from the caller rather than from the system.
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EslError::validation("page", "must be at least 1");
        assert_eq!(err.to_string(), "Validation error for page: must be at least 1");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            EslError::InvalidParams {
                message: "Missing required parameter: query".into()
            }
            .http_status(),
            400
        );
        assert_eq!(
            EslError::SearchUnavailable {
                message: "all adapters failed".into()
            }
            .http_status(),
            500
        );
        assert_eq!(
            EslError::Timeout(std::time::Duration::from_secs(2)).http_status(),
            500
        );
    }

    #[test]
    fn test_rusqlite_conversion() {
        let err: EslError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, EslError::Database { source: Some(_), .. }));
        assert!(!err.is_client_error());
    }
}

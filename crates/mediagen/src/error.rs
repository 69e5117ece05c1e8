//! Error types for the mediagen client
//!
//! Every fallible operation in the HTTP layer and the media resources returns
//! [`Result`]. The generation tracker deliberately does not: its failures are
//! surfaced as notifications followed by a lifecycle reset.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for operations that can fail with a mediagen error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the mediagen client.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend rejected the request (400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Authentication failed (401).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal server error (500+).
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// Generic API error for status codes not covered above.
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// The backend answered with an `"error"` envelope.
    #[error("Backend error: {message}")]
    Backend {
        /// Message carried by the envelope
        message: String,
    },

    /// Failed to deserialize a backend response.
    #[error("Failed to parse backend response: {0}")]
    ResponseValidation(String),

    /// Network or connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout.
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client configuration or initialization error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// Invalid HTTP header name.
    #[error("Invalid HTTP header name: {0}")]
    InvalidHeaderName(String),

    /// Invalid HTTP header value.
    #[error("Invalid HTTP header value: {0}")]
    InvalidHeaderValue(String),

    /// An error annotated with the operation that produced it.
    #[error("{context}: {source}")]
    WithContext {
        /// Context description
        context: String,
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Create an error from a non-2xx HTTP response.
    ///
    /// The backend wraps failures in its usual envelope; when the body parses
    /// as one, the envelope `message` is used, otherwise the raw body.
    pub fn from_response(status: u16, body: &str, headers: &http::HeaderMap) -> Self {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.to_string());

        match status {
            400 => Error::BadRequest(message),
            401 => Error::Authentication(message),
            404 => Error::NotFound(message),
            s if s >= 500 => Error::InternalServerError(message),
            _ => {
                let message = match request_id(headers) {
                    Some(id) => format!("{} (request {})", message, id),
                    None => message,
                };
                Error::ApiError { status, message }
            }
        }
    }

    /// Check if this error is worth retrying at the transport level.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::InternalServerError(_) => true,
            Error::Connection(_) => true,
            Error::Timeout(_) => true,
            Error::ApiError { status, .. } => *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// Add context to an error.
    pub fn context<C>(self, context: C) -> Self
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        Error::WithContext {
            context: context.to_string(),
            source: Box::new(self),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
}

fn request_id(headers: &http::HeaderMap) -> Option<&str> {
    headers.get("x-request-id").and_then(|v| v.to_str().ok())
}

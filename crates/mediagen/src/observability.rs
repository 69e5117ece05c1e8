//! Centralized observability utilities for structured logging
//!
//! All HTTP requests/responses are logged through this layer so that field
//! names stay consistent across resources.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Responses slower than this are logged at `warn`.
pub const SLOW_RESPONSE_THRESHOLD: Duration = Duration::from_secs(5);

/// HTTP request metadata for structured logging
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request path
    pub path: String,
    /// Request body size in bytes (optional)
    pub body_size: Option<usize>,
}

impl RequestMetadata {
    /// Create new request metadata
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body_size: None,
        }
    }

    /// Set the request body size
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// Log request being sent
    pub fn log_request(&self) {
        debug!(
            method = %self.method,
            path = %self.path,
            body_size = self.body_size,
            "Sending HTTP request"
        );
    }
}

/// HTTP response metadata for structured logging
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    /// HTTP status code (0 when no response was received)
    pub status: u16,
    /// Response body size in bytes (optional)
    pub body_size: Option<usize>,
    /// Time elapsed for the request
    pub elapsed: Duration,
    /// Number of retries taken (if any)
    pub retries: u32,
}

impl ResponseMetadata {
    /// Create new response metadata
    pub fn new(status: u16, elapsed: Duration) -> Self {
        Self {
            status,
            body_size: None,
            elapsed,
            retries: 0,
        }
    }

    /// Set the response body size
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// Set the number of retries
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Whether the response took longer than [`SLOW_RESPONSE_THRESHOLD`].
    pub fn is_slow(&self) -> bool {
        self.elapsed > SLOW_RESPONSE_THRESHOLD
    }

    /// Log a received response (any status)
    pub fn log_response(&self, request: &RequestMetadata) {
        if self.is_slow() {
            warn!(
                method = %request.method,
                path = %request.path,
                status = self.status,
                elapsed_ms = self.elapsed.as_millis() as u64,
                retries = self.retries,
                "Slow HTTP response"
            );
        } else {
            debug!(
                method = %request.method,
                path = %request.path,
                status = self.status,
                elapsed_ms = self.elapsed.as_millis() as u64,
                body_size = self.body_size,
                retries = self.retries,
                "HTTP response received"
            );
        }
    }

    /// Log a request that failed without a usable response
    pub fn log_error(&self, request: &RequestMetadata, error: &str) {
        warn!(
            method = %request.method,
            path = %request.path,
            elapsed_ms = self.elapsed.as_millis() as u64,
            error = %error,
            retries = self.retries,
            "HTTP request failed"
        );
    }
}

/// Timer for measuring request duration
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Convenience for binaries and demos; libraries should leave subscriber
/// setup to the application. Returns `false` if a global subscriber was
/// already installed.
#[cfg(feature = "trace")]
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok()
}

/// Log validation error
pub fn log_validation_error(field: &str, reason: &str) {
    debug!(
        field = %field,
        reason = %reason,
        "Request validation failed"
    );
}

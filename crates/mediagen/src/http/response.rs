//! HTTP response handling
//!
//! The generation backend wraps every payload in an envelope:
//!
//! ```json
//! { "status": "success", "data": { "task_id": "img_1", "total": 3 }, "message": "" }
//! ```
//!
//! [`Response::parse_result`] checks the HTTP status, then the envelope
//! status, and only then deserializes `data` into the requested type.

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// HTTP response wrapper.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    retries_taken: u32,
    elapsed: Duration,
}

/// The backend's response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// `"success"` or `"error"`
    pub status: String,
    /// Endpoint-specific payload
    #[serde(default)]
    pub data: serde_json::Value,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

impl Envelope {
    /// Whether the envelope reports success.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

impl Response {
    /// Create a new response.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: Vec<u8>,
        retries_taken: u32,
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            retries_taken,
            elapsed,
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Number of transport retries before this response.
    pub fn retries_taken(&self) -> u32 {
        self.retries_taken
    }

    /// Time spent on the request, retries included.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Get the body as a string.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.clone()).map_err(|e| Error::ResponseValidation(e.to_string()))
    }

    /// Parse the whole body as JSON, ignoring the envelope.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::Serialization)
    }

    /// Check if the response is successful (2xx status).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the response is an error (4xx or 5xx status).
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// Parse the envelope and return its payload as `T`.
    ///
    /// # Errors
    ///
    /// - non-2xx status: the error from [`Error::from_response`]
    /// - envelope with `status: "error"`: [`Error::Backend`]
    /// - body or `data` that does not match: [`Error::ResponseValidation`]
    pub fn parse_result<T: DeserializeOwned>(self) -> Result<T> {
        if self.is_error() {
            return Err(Error::from_response(
                self.status.as_u16(),
                &String::from_utf8_lossy(&self.body),
                &self.headers,
            ));
        }

        let envelope: Envelope = serde_json::from_slice(&self.body)
            .map_err(|e| Error::ResponseValidation(format!("invalid envelope: {}", e)))?;

        if !envelope.is_success() {
            return Err(Error::Backend {
                message: envelope.message,
            });
        }

        serde_json::from_value(envelope.data)
            .map_err(|e| Error::ResponseValidation(format!("unexpected payload: {}", e)))
    }
}

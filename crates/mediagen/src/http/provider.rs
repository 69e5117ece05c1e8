//! HTTP provider trait for abstracting the generation backend transport
//!
//! Resources talk to the backend only through [`HttpProvider`], so tests and
//! alternative transports can stand in for the reqwest implementation.

use crate::{
    error::Result,
    http::{Method, RequestBuilder, Response},
};
use async_trait::async_trait;
use std::fmt;

/// Provider trait for making HTTP requests to a generation backend.
///
/// Implementations handle authentication, default headers and retries for
/// their transport while exposing one uniform interface to the resources.
#[async_trait]
pub trait HttpProvider: Send + Sync + fmt::Debug {
    /// Make a request and return the raw response.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `path` - Endpoint path relative to the base URL (e.g., "media/cancel")
    /// * `body` - Optional request body (will be serialized to JSON)
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built or fails in transit.
    /// Non-2xx responses are returned as `Ok` and turned into errors when parsed.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&(dyn erased_serde::Serialize + Send + Sync)>,
    ) -> Result<Response>;

    /// Create a `RequestBuilder` for this provider.
    ///
    /// Used by resources that need query parameters or custom headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed.
    fn create_request(&self, method: Method, path: &str) -> Result<RequestBuilder>;

    /// Get the provider name for debugging/logging.
    fn provider_name(&self) -> &'static str;

    /// Get the base URL for this provider (for debugging).
    fn base_url(&self) -> &str;

    /// Cast to `std::any::Any` for downcasting to concrete types.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Helper function to serialize a body to JSON bytes.
pub(crate) fn serialize_body(
    body: &(dyn erased_serde::Serialize + Send + Sync),
) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(crate::error::Error::Serialization)
}

//! HTTP client abstraction
//!
//! This module provides the transport layer for the client: a provider trait,
//! the reqwest-backed provider, a request builder with bounded retries, and
//! response parsing that unwraps the backend's JSON envelope.

pub use backend_provider::{BackendHttpProvider, BackendHttpProviderBuilder};
pub use provider::HttpProvider;
pub use request::RequestBuilder;
pub use response::{Envelope, Response};

mod backend_provider;
pub mod provider;
mod request;
mod response;

// Re-export HTTP types from the http crate for convenience
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

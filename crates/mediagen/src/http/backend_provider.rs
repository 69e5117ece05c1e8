//! reqwest-backed provider for the generation backend
//!
//! Handles bearer authentication, default headers, timeouts and retries for
//! requests to the backend's REST endpoints.

use super::{HttpProvider, Method, RequestBuilder, provider::serialize_body};
use crate::error::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use url::Url;

/// HTTP provider for the generation backend.
///
/// # Architecture
///
/// - Uses `reqwest` for the HTTP client
/// - Optional `Authorization: Bearer` authentication
/// - Retries idempotent requests on transient failures
/// - Endpoint paths are joined relative to the base URL, so a base URL with a
///   path prefix (`http://host/api/`) keeps that prefix
///
/// # Example
///
/// ```rust,no_run
/// use mediagen::http::BackendHttpProvider;
/// use std::sync::Arc;
///
/// let provider = Arc::new(BackendHttpProvider::builder()
///     .base_url("http://localhost:8000")
///     .build()
///     .unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct BackendHttpProvider {
    pub(crate) inner: Arc<ProviderInner>,
}

#[derive(Debug)]
pub(crate) struct ProviderInner {
    /// HTTP client for making requests
    pub(crate) http_client: reqwest::Client,
    /// Base URL, always ending in `/`
    pub(crate) base_url: Url,
    /// Bearer token
    pub(crate) api_token: Option<SecretString>,
    /// Default timeout for requests
    pub(crate) timeout: Duration,
    /// Maximum number of retries
    pub(crate) max_retries: u32,
    /// Custom headers to include with every request
    pub(crate) default_headers: http::HeaderMap,
}

impl BackendHttpProvider {
    /// Create a new builder for configuring the provider.
    pub fn builder() -> BackendHttpProviderBuilder {
        BackendHttpProviderBuilder::default()
    }

    /// Create a request builder with provider configuration.
    fn build_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                Error::InvalidUrl(format!("Failed to construct URL from path '{}': {}", path, e))
            })?;

        let mut builder = RequestBuilder::new(method, url)
            .with_client(self.inner.http_client.clone())
            .timeout(self.inner.timeout)
            .max_retries(self.inner.max_retries)
            .typed_header(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("application/json"),
            );

        if let Some(token) = &self.inner.api_token {
            builder = builder.header("authorization", format!("Bearer {}", token.expose_secret()))?;
        }

        for (key, value) in &self.inner.default_headers {
            builder = builder.typed_header(key.clone(), value.clone());
        }

        Ok(builder)
    }
}

#[async_trait]
impl HttpProvider for BackendHttpProvider {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&(dyn erased_serde::Serialize + Send + Sync)>,
    ) -> Result<super::Response> {
        let mut builder = self.build_request(method, path)?;

        if let Some(body) = body {
            builder = builder.body(serialize_body(body)?);
        }

        builder.send().await
    }

    fn create_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        self.build_request(method, path)
    }

    fn provider_name(&self) -> &'static str {
        "backend"
    }

    fn base_url(&self) -> &str {
        self.inner.base_url.as_str()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Builder for creating a `BackendHttpProvider` with custom configuration.
#[derive(Default)]
pub struct BackendHttpProviderBuilder {
    api_token: Option<SecretString>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    default_headers: http::HeaderMap,
}

impl BackendHttpProviderBuilder {
    /// Set the bearer token.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::new(token.into().into_boxed_str()));
        self
    }

    pub(crate) fn api_token_secret(mut self, token: SecretString) -> Self {
        self.api_token = Some(token);
        self
    }

    /// Set the backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the maximum number of retries for idempotent requests.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Add a custom header to include with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key_str = key.into();
        let value_str = value.into();

        let key = key_str
            .parse::<http::HeaderName>()
            .map_err(|_| Error::InvalidHeaderName(key_str.clone()))?;
        let value = value_str
            .parse::<http::HeaderValue>()
            .map_err(|_| Error::InvalidHeaderValue(value_str.clone()))?;

        self.default_headers.insert(key, value);
        Ok(self)
    }

    pub(crate) fn headers(mut self, headers: http::HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }

    /// Build the provider with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No base URL is configured
    /// - The base URL is empty, unparseable or not http/https
    /// - HTTP client creation fails
    pub fn build(self) -> Result<BackendHttpProvider> {
        let timeout = self.timeout.unwrap_or(crate::config::DEFAULT_TIMEOUT);

        let base_url = parse_base_url(
            self.base_url
                .as_deref()
                .ok_or_else(|| Error::MissingConfig("base_url".to_string()))?,
        )?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("mediagen-rust/{}", crate::VERSION))
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        let inner = Arc::new(ProviderInner {
            http_client,
            base_url,
            api_token: self.api_token,
            timeout,
            max_retries: self.max_retries.unwrap_or(crate::config::DEFAULT_MAX_RETRIES),
            default_headers: self.default_headers,
        });

        Ok(BackendHttpProvider { inner })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("Base URL cannot be empty".to_string()));
    }

    let mut base_url: Url = trimmed
        .parse()
        .map_err(|e| Error::InvalidUrl(format!("{}", e)))?;

    match base_url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(Error::InvalidUrl(format!(
                "Invalid URL scheme '{}'. Only 'http' and 'https' are supported.",
                scheme
            )));
        }
    }

    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }

    Ok(base_url)
}

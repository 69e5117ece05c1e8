//! Main client implementation for the generation backend

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::{
    config::{ClientConfig, TrackerConfig},
    error::{Error, Result},
    http::{BackendHttpProvider, HttpProvider, RequestBuilder},
    resources::Media,
    tracker::{GenerationTracker, GenerationTrackerBuilder},
};

/// Client for a media generation backend.
///
/// Cheap to clone; clones share the HTTP connection pool and resources.
///
/// # Example
///
/// ```rust,no_run
/// use mediagen::Client;
///
/// let client = Client::new("http://localhost:8000");
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// HTTP provider for making requests (handles auth, retries, etc.)
    provider: Arc<dyn HttpProvider>,

    /// Timing for trackers created by [`Client::tracker`]
    tracker_config: TrackerConfig,
}

impl Client {
    /// Create a new client for the backend at `base_url`.
    ///
    /// # Panics
    ///
    /// Panics if `base_url` is not a valid http/https URL. Use
    /// [`Client::try_new()`] to handle the error instead.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder()
            .base_url(base_url)
            .build()
            .expect("Failed to build client with provided base URL")
    }

    /// Create a new client for the backend at `base_url` (fallible version).
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty, unparseable or not
    /// http/https, or if the HTTP client cannot be created.
    pub fn try_new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder for advanced configuration.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client from environment variables (see [`ClientConfig::from_env`]).
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Create a client with a custom HTTP provider.
    pub fn from_provider(provider: Arc<dyn HttpProvider>) -> Self {
        Self::with_parts(provider, TrackerConfig::default())
    }

    fn with_parts(provider: Arc<dyn HttpProvider>, tracker_config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                provider,
                tracker_config,
            }),
        }
    }

    /// Create a client from a configuration object.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is missing or invalid, or if the
    /// tracker timing is invalid.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.tracker.validate()?;

        let mut provider_builder = BackendHttpProvider::builder()
            .timeout(config.timeout)
            .max_retries(config.max_retries)
            .headers(config.default_headers);

        if let Some(base_url) = config.base_url {
            provider_builder = provider_builder.base_url(base_url);
        }
        if let Some(token) = config.api_token {
            provider_builder = provider_builder.api_token_secret(token);
        }

        let provider = Arc::new(provider_builder.build()?);
        Ok(Self::with_parts(provider, config.tracker))
    }

    /// Access the media generation endpoints.
    ///
    /// The handle shares this client's connection pool and is not cached on
    /// the client, so dropping every client and handle frees the pool.
    pub fn media(&self) -> Media {
        Media::new(self.clone())
    }

    /// Create a generation tracker polling this client, using the client's
    /// tracker timing and logging notifications.
    pub fn tracker(&self) -> GenerationTracker<Client> {
        GenerationTracker::with_config(self.clone(), self.inner.tracker_config)
    }

    /// Create a tracker builder preconfigured with the client's tracker timing.
    pub fn tracker_builder(&self) -> GenerationTrackerBuilder<Client> {
        GenerationTracker::builder(self.clone()).config(self.inner.tracker_config)
    }

    /// Timing for trackers created from this client.
    pub fn tracker_config(&self) -> TrackerConfig {
        self.inner.tracker_config
    }

    /// Create a request builder for custom requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be constructed from the base URL and path.
    pub(crate) fn request(&self, method: http::Method, path: &str) -> Result<RequestBuilder> {
        self.inner.provider.create_request(method, path)
    }

    /// Get the base URL of the backend.
    pub fn base_url(&self) -> &str {
        self.inner.provider.base_url()
    }

    /// Get the provider name (for debugging).
    pub fn provider_name(&self) -> &'static str {
        self.inner.provider.provider_name()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("provider", &self.inner.provider)
            .field("tracker_config", &self.inner.tracker_config)
            .finish_non_exhaustive()
    }
}

/// Builder for creating a configured [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Set the backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Set the bearer token.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = Some(SecretString::new(token.into().into_boxed_str()));
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries for idempotent requests.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Add a default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self> {
        let key_str = key.into();
        let value_str = value.into();

        let key = key_str
            .parse::<http::HeaderName>()
            .map_err(|_| Error::InvalidHeaderName(key_str.clone()))?;
        let value = value_str
            .parse::<http::HeaderValue>()
            .map_err(|_| Error::InvalidHeaderValue(value_str.clone()))?;

        self.config.default_headers.insert(key, value);
        Ok(self)
    }

    /// Set tracker timing.
    pub fn tracker(mut self, tracker: TrackerConfig) -> Self {
        self.config.tracker = tracker;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// See [`Client::from_config`].
    pub fn build(self) -> Result<Client> {
        Client::from_config(self.config)
    }
}

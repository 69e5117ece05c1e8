//! Configuration for the mediagen client and generation tracker

use http::HeaderMap;
use secrecy::SecretString;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of transport-level retries.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default interval between progress polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default time a terminal status stays visible before the tracker resets.
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_millis(1500);

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the generation backend
    pub base_url: Option<String>,

    /// Bearer token sent as `Authorization` when set
    pub api_token: Option<SecretString>,

    /// Default timeout for requests
    pub timeout: Duration,

    /// Maximum number of retries for failed requests
    pub max_retries: u32,

    /// Custom headers to include with every request
    pub default_headers: HeaderMap,

    /// Timing used by trackers created from this client
    pub tracker: TrackerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            default_headers: HeaderMap::new(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration pointing at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Then this looks for:
    /// - `MEDIAGEN_BASE_URL` for the backend base URL
    /// - `MEDIAGEN_API_TOKEN` for bearer authentication
    /// - `MEDIAGEN_TIMEOUT` for request timeout (in seconds)
    /// - `MEDIAGEN_MAX_RETRIES` for maximum retry attempts
    /// - `MEDIAGEN_POLL_INTERVAL_MS` for the progress poll interval
    /// - `MEDIAGEN_RESET_DELAY_MS` for the terminal display delay
    ///
    /// Unparseable numeric values are ignored and the default is kept.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        use std::env;

        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(base_url) = env::var("MEDIAGEN_BASE_URL") {
            config.base_url = Some(base_url);
        }

        if let Ok(token) = env::var("MEDIAGEN_API_TOKEN") {
            config.api_token = Some(SecretString::new(token.into_boxed_str()));
        }

        if let Ok(timeout_str) = env::var("MEDIAGEN_TIMEOUT")
            && let Ok(timeout_secs) = timeout_str.parse::<u64>()
        {
            config.timeout = Duration::from_secs(timeout_secs);
        }

        if let Ok(max_retries_str) = env::var("MEDIAGEN_MAX_RETRIES")
            && let Ok(max_retries) = max_retries_str.parse::<u32>()
        {
            config.max_retries = max_retries;
        }

        if let Ok(interval_str) = env::var("MEDIAGEN_POLL_INTERVAL_MS")
            && let Ok(interval_ms) = interval_str.parse::<u64>()
        {
            config.tracker.poll_interval = Duration::from_millis(interval_ms);
        }

        if let Ok(delay_str) = env::var("MEDIAGEN_RESET_DELAY_MS")
            && let Ok(delay_ms) = delay_str.parse::<u64>()
        {
            config.tracker.reset_delay = Duration::from_millis(delay_ms);
        }

        config.tracker.validate()?;
        Ok(config)
    }

    /// Merge this configuration with another, with the other taking precedence.
    pub fn merge(mut self, other: ClientConfig) -> Self {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.api_token.is_some() {
            self.api_token = other.api_token;
        }
        if other.timeout != DEFAULT_TIMEOUT {
            self.timeout = other.timeout;
        }
        if other.max_retries != DEFAULT_MAX_RETRIES {
            self.max_retries = other.max_retries;
        }
        for (key, value) in other.default_headers.iter() {
            self.default_headers.insert(key.clone(), value.clone());
        }
        if other.tracker != TrackerConfig::default() {
            self.tracker = other.tracker;
        }

        self
    }
}

/// Timing of a [`GenerationTracker`](crate::tracker::GenerationTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Interval between progress polls while a task is active
    pub poll_interval: Duration,

    /// How long a terminal status stays visible before the tracker resets
    pub reset_delay: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reset_delay: DEFAULT_RESET_DELAY,
        }
    }
}

impl TrackerConfig {
    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the terminal display delay.
    pub fn reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    /// Reject timings the poller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidRequest(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for creating ClientConfig with a fluent API.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
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

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Add a default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid according to HTTP specifications.
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key_str = key.into();
        let value_str = value.into();

        let key: http::HeaderName = key_str
            .parse()
            .map_err(|_| Error::InvalidHeaderName(key_str.clone()))?;
        let value: http::HeaderValue = value_str
            .parse()
            .map_err(|_| Error::InvalidHeaderValue(value_str.clone()))?;

        self.config.default_headers.insert(key, value);
        Ok(self)
    }

    /// Set tracker timing.
    pub fn tracker(mut self, tracker: TrackerConfig) -> Self {
        self.config.tracker = tracker;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

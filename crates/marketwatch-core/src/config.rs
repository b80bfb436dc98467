//! Client configuration.

/// Governs the retry stage of the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    /// Enables or disables retries entirely.
    pub enabled: bool,
    /// Hard ceiling on retry attempts per logical request.
    pub max_retry_attempts: u32,
    /// Base delay doubled on each retry after the first.
    pub delay_time_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retry_attempts: 3,
            delay_time_ms: 1_000,
        }
    }
}

impl RetryOptions {
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            max_retry_attempts: 0,
            delay_time_ms: 0,
        }
    }
}

/// Settings shared by every component of the access layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the service, without a trailing slash.
    pub base_url: String,
    pub retry: RetryOptions,
    /// Prefix applied to every persistent storage key.
    pub storage_prefix: String,
    /// Page size the pagination walker requests when the caller leaves
    /// `first` unset.
    pub default_page_size: u32,
    /// Seconds before the actual `exp` claim at which an access token is
    /// already treated as expired.
    pub token_expiry_skew_secs: i64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            base_url,
            retry: RetryOptions::default(),
            storage_prefix: String::from("market-watcher"),
            default_page_size: 100,
            token_expiry_skew_secs: 300,
        }
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_storage_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage_prefix = prefix.into();
        self
    }

    /// Resolve a relative path against the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

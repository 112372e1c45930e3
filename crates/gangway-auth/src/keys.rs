//! Verification-key resolution and caching.
//!
//! Agent tokens are signed by one of three issuer environments; each
//! environment publishes its keys under a URL template with a `{kid}`
//! placeholder. [`KeyResolver`] picks the template from the issuer prefix,
//! and [`KeyCache`] fetches and remembers the PEM key material for the
//! life of the process.
//!
//! A failed fetch is never cached: only successfully retrieved keys enter
//! the map, so a transient outage cannot poison later requests. Entries
//! are dropped only by an explicit [`KeyCache::clear`].

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

/// Placeholder substituted with the token's key id.
const KID_PLACEHOLDER: &str = "{kid}";

/// Per-environment key URL templates.
///
/// Each template must contain a literal `{kid}` placeholder.
#[derive(Debug, Clone)]
pub struct KeyEndpoints {
    /// Template for issuers with a `qa-` prefix.
    pub qa_url: String,
    /// Template for issuers with a `stg-` prefix.
    pub stg_url: String,
    /// Template for all other issuers.
    pub prod_url: String,
}

/// Maps an issuer/key-id pair to the key fetch URL.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    endpoints: KeyEndpoints,
}

impl KeyResolver {
    #[must_use]
    pub fn new(endpoints: KeyEndpoints) -> Self {
        Self { endpoints }
    }

    /// Resolves the fetch URL for the given issuer and key id.
    ///
    /// The issuer prefix selects the environment; the key id is substituted
    /// into the template.
    #[must_use]
    pub fn resolve(&self, issuer: &str, kid: &str) -> String {
        let template = if issuer.starts_with("qa-") {
            &self.endpoints.qa_url
        } else if issuer.starts_with("stg-") {
            &self.endpoints.stg_url
        } else {
            &self.endpoints.prod_url
        };
        template.replace(KID_PLACEHOLDER, kid)
    }
}

/// Configuration for the key cache's HTTP client.
#[derive(Debug, Clone)]
pub struct KeyCacheConfig {
    /// TCP connect timeout (default: 5 seconds).
    pub connect_timeout: Duration,
    /// Overall request timeout (default: 10 seconds).
    pub read_timeout: Duration,
}

impl Default for KeyCacheConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
        }
    }
}

impl KeyCacheConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TCP connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the overall request timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Internal error for a single fetch attempt; callers of [`KeyCache::get`]
/// only observe the absence of a key.
#[derive(Debug, thiserror::Error)]
enum KeyFetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: status {0}")]
    Http(u16),

    #[error("Empty key response")]
    Empty,
}

/// Process-wide cache of fetched verification-key material, keyed by
/// fetch URL.
///
/// Populated lazily; a cache hit short-circuits network access entirely.
/// Writes are idempotent (the same URL always yields the same key bytes),
/// so concurrent misses racing to insert are harmless.
pub struct KeyCache {
    http_client: reqwest::Client,
    keys: RwLock<HashMap<String, String>>,
}

impl KeyCache {
    /// Creates a new key cache.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(config: KeyCacheConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .user_agent(concat!("gangway/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a key cache with default timeouts.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(KeyCacheConfig::default())
    }

    /// Returns the key material for the given URL, fetching it on a cache
    /// miss.
    ///
    /// Returns `None` when the fetch fails or yields no content; the
    /// failure is logged but never cached.
    pub async fn get(&self, url: &str) -> Option<String> {
        {
            let keys = self.keys.read().await;
            if let Some(key) = keys.get(url) {
                tracing::debug!("Key cache hit for {}", url);
                return Some(key.clone());
            }
        }

        match self.fetch_remote(url).await {
            Ok(key) => {
                let mut keys = self.keys.write().await;
                keys.insert(url.to_string(), key.clone());
                tracing::info!("Fetched and cached verification key from {}", url);
                Some(key)
            }
            Err(e) => {
                tracing::error!("Failed to fetch verification key from {}: {}", url, e);
                None
            }
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, KeyFetchError> {
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(KeyFetchError::Http(response.status().as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(KeyFetchError::Empty);
        }
        Ok(body)
    }

    /// Drops all cached keys. The next lookup per URL fetches again.
    pub async fn clear(&self) {
        let mut keys = self.keys.write().await;
        keys.clear();
        tracing::info!("Verification key cache cleared");
    }

    /// Returns the number of cached keys.
    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    /// Returns `true` if no keys are cached.
    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

//! Bearer-token cache for the booking system's API.
//!
//! The booking system issues short-lived bearer tokens per microsite.
//! This cache mints them on demand from a static credentials table and
//! keeps each token for a fixed TTL from issuance, checked on read; there
//! is no background sweep.
//!
//! Concurrent callers hitting an expired or missing entry may race to
//! fetch; the last write wins. The fetch is idempotent and cheap, so no
//! per-site lock is taken - serialising all requests for a site would cost
//! more than the occasional duplicate mint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::http::ClientTimeouts;

/// Default token lifetime: 30 minutes from issuance.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Username/password pair used to mint tokens for one site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteCredentials {
    pub username: String,
    pub password: String,
}

/// Errors from token acquisition.
#[derive(Debug, thiserror::Error)]
pub enum BookingTokenError {
    /// The site key has no entry in the credentials table.
    #[error("No credentials registered for site: {0}")]
    NoCredentials(String),

    /// The authentication call failed at the network level.
    #[error("Token fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The authentication call returned a non-success status.
    #[error("Token fetch failed: HTTP status {0}")]
    Http(u16),

    /// The response carried no token field.
    #[error("No token in authentication response")]
    MissingToken,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    issued_at: Instant,
}

impl CachedToken {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.issued_at.elapsed() >= ttl
    }
}

#[derive(Debug, serde::Serialize)]
struct AuthRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(rename = "micrositeId")]
    microsite_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: Option<String>,
}

/// Site-keyed cache of booking-system bearer tokens.
///
/// Shared across all concurrent requests; site keys are normalised to
/// lowercase on every access.
pub struct BookingTokenCache {
    http_client: reqwest::Client,
    auth_url: String,
    credentials: HashMap<String, SiteCredentials>,
    tokens: RwLock<HashMap<String, CachedToken>>,
    ttl: Duration,
}

impl BookingTokenCache {
    /// Creates a cache minting tokens from `auth_url` with the given
    /// credentials table.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(auth_url: impl Into<String>, credentials: HashMap<String, SiteCredentials>) -> Self {
        let http_client = ClientTimeouts::default().client();

        let credentials = credentials
            .into_iter()
            .map(|(site, creds)| (site.to_lowercase(), creds))
            .collect();

        Self {
            http_client,
            auth_url: auth_url.into(),
            credentials,
            tokens: RwLock::new(HashMap::new()),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Overrides the token lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Overrides the HTTP client timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: ClientTimeouts) -> Self {
        self.http_client = timeouts.client();
        self
    }

    /// Returns `true` if credentials are registered for the site.
    #[must_use]
    pub fn has_credentials(&self, site: &str) -> bool {
        self.credentials.contains_key(&site.to_lowercase())
    }

    /// Returns a valid bearer token for the site, minting a fresh one when
    /// the cached token is absent or past its TTL.
    pub async fn token(&self, site: &str) -> Result<String, BookingTokenError> {
        let key = site.to_lowercase();

        {
            let tokens = self.tokens.read().await;
            if let Some(cached) = tokens.get(&key)
                && !cached.is_expired(self.ttl)
            {
                tracing::debug!("Cached token still valid for site {}", key);
                return Ok(cached.token.clone());
            }
        }

        tracing::debug!("Token expired or missing, requesting a new one for site {}", key);
        self.mint_and_store(&key).await
    }

    /// Forcibly evicts the site's token and mints a fresh one.
    pub async fn refresh(&self, site: &str) -> Result<String, BookingTokenError> {
        let key = site.to_lowercase();
        tracing::info!("Refreshing booking token for site {}", key);
        {
            let mut tokens = self.tokens.write().await;
            tokens.remove(&key);
        }
        self.mint_and_store(&key).await
    }

    /// Drops all cached tokens.
    pub async fn clear(&self) {
        let mut tokens = self.tokens.write().await;
        tokens.clear();
        tracing::info!("Booking token cache cleared");
    }

    async fn mint_and_store(&self, key: &str) -> Result<String, BookingTokenError> {
        let creds = self
            .credentials
            .get(key)
            .ok_or_else(|| BookingTokenError::NoCredentials(key.to_string()))?;

        let token = self.fetch_token(key, creds).await?;

        let mut tokens = self.tokens.write().await;
        tokens.insert(
            key.to_string(),
            CachedToken {
                token: token.clone(),
                issued_at: Instant::now(),
            },
        );
        tracing::info!("New booking token obtained and cached for site {}", key);
        Ok(token)
    }

    async fn fetch_token(
        &self,
        site: &str,
        creds: &SiteCredentials,
    ) -> Result<String, BookingTokenError> {
        tracing::info!("Fetching booking token for user {} site {}", creds.username, site);

        let response = self
            .http_client
            .post(&self.auth_url)
            .header("Accept", "application/json")
            .json(&AuthRequest {
                username: &creds.username,
                password: &creds.password,
                microsite_id: site,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::error!("Token fetch failed with HTTP {}", response.status());
            return Err(BookingTokenError::Http(response.status().as_u16()));
        }

        let body: AuthResponse = response.json().await?;
        body.token.ok_or(BookingTokenError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> HashMap<String, SiteCredentials> {
        HashMap::from([(
            "Site1".to_string(),
            SiteCredentials {
                username: "api_user".to_string(),
                password: "api_pass".to_string(),
            },
        )])
    }

    fn cache_for(server: &MockServer) -> BookingTokenCache {
        BookingTokenCache::new(
            format!("{}/authentication/authenticate", server.uri()),
            credentials(),
        )
    }

    #[tokio::test]
    async fn mints_and_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/authenticate"))
            .and(body_partial_json(serde_json::json!({
                "username": "api_user",
                "password": "api_pass",
                "micrositeId": "site1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "t-1",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        assert_eq!(cache.token("site1").await.unwrap(), "t-1");
        // Site keys are case-insensitive and the second read hits the cache.
        assert_eq!(cache.token("SITE1").await.unwrap(), "t-1");
    }

    #[tokio::test]
    async fn expired_token_triggers_exactly_one_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "t-1",
            })))
            .expect(2)
            .mount(&server)
            .await;

        let cache = cache_for(&server).with_ttl(Duration::from_millis(50));
        cache.token("site1").await.unwrap();
        cache.token("site1").await.unwrap(); // within TTL, cached
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.token("site1").await.unwrap(); // past TTL, refetched
        cache.token("site1").await.unwrap(); // cached again
    }

    #[tokio::test]
    async fn refresh_forces_a_new_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "t-1",
            })))
            .expect(2)
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        cache.token("site1").await.unwrap();
        cache.refresh("site1").await.unwrap();
    }

    #[tokio::test]
    async fn unknown_site_is_rejected_without_network() {
        let server = MockServer::start().await;
        let cache = cache_for(&server);

        assert!(!cache.has_credentials("elsewhere"));
        assert!(matches!(
            cache.token("elsewhere").await,
            Err(BookingTokenError::NoCredentials(site)) if site == "elsewhere"
        ));
    }

    #[tokio::test]
    async fn missing_token_field_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        assert!(matches!(
            cache.token("site1").await,
            Err(BookingTokenError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn http_error_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/authenticate"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/authentication/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "t-2",
            })))
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        assert!(matches!(
            cache.token("site1").await,
            Err(BookingTokenError::Http(503))
        ));
        assert_eq!(cache.token("site1").await.unwrap(), "t-2");
    }
}

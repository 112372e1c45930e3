//! Booking-system client.
//!
//! The agency read is the one call whose failure must be distinguishable
//! from "not found" (it drives the ERROR status), so it returns a typed
//! result. The write operations and the user-existence probe are
//! best-effort by contract: they report a boolean and log their failures,
//! because the orchestrator degrades rather than aborts on them.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use gangway_auth::{BookingTokenCache, BookingTokenError, ClientTimeouts};
use gangway_core::{AgencyUpsert, BookingAgency, UserCreate};

/// Header carrying the booking-system bearer token.
const AUTH_TOKEN_HEADER: &str = "auth-token";

/// Language passed on agency reads.
const AGENCY_READ_LANGUAGE: &str = "DE";

/// Errors from required booking-system reads.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The call returned an unexpected non-success status.
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// No bearer token could be obtained for the site.
    #[error("Authentication error: {0}")]
    Auth(#[from] BookingTokenError),

    /// The base URL rejected a path segment (cannot-be-a-base URL).
    #[error("Invalid booking API base URL")]
    InvalidBaseUrl,
}

/// Contract the reconciliation orchestrator requires from the booking
/// system.
#[async_trait]
pub trait BookingSystem: Send + Sync {
    /// Fetches the agency record; `None` means the agency does not exist.
    async fn agency(
        &self,
        site: &str,
        agency_number: &str,
    ) -> Result<Option<BookingAgency>, BookingError>;

    /// Creates an agency; `true` on success.
    async fn create_agency(&self, request: &AgencyUpsert, site: &str) -> bool;

    /// Updates an agency; `true` on success.
    async fn update_agency(&self, request: &AgencyUpsert, site: &str) -> bool;

    /// Checks whether the user exists for the agency.
    async fn user_exists(&self, site: &str, agency_number: &str, user_id: &str) -> bool;

    /// Creates a user under the request's agency; `true` on success.
    async fn create_user(&self, request: &UserCreate, site: &str) -> bool;
}

/// HTTP implementation of [`BookingSystem`].
pub struct BookingClient {
    http_client: reqwest::Client,
    base_url: Url,
    tokens: Arc<BookingTokenCache>,
}

impl BookingClient {
    /// Creates a client for the booking API rooted at `base_url`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(base_url: Url, tokens: Arc<BookingTokenCache>) -> Self {
        Self {
            http_client: ClientTimeouts::default().client(),
            base_url,
            tokens,
        }
    }

    /// Overrides the HTTP client timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: ClientTimeouts) -> Self {
        self.http_client = timeouts.client();
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BookingError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BookingError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn bearer(&self, site: &str) -> Result<String, BookingError> {
        Ok(self.tokens.token(site).await?)
    }
}

#[async_trait]
impl BookingSystem for BookingClient {
    async fn agency(
        &self,
        site: &str,
        agency_number: &str,
    ) -> Result<Option<BookingAgency>, BookingError> {
        let mut url = self.endpoint(&["agency", site, agency_number])?;
        url.query_pairs_mut()
            .append_pair("lang", AGENCY_READ_LANGUAGE);
        tracing::debug!("Fetching booking agency record: {}", url);

        let token = self.bearer(site).await?;
        let response = self
            .http_client
            .get(url)
            .header(AUTH_TOKEN_HEADER, token)
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::info!(
                    "Agency not found in booking system: site={}, agency={}",
                    site,
                    agency_number
                );
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => {
                tracing::error!("Booking agency read failed with HTTP {}", status);
                Err(BookingError::Http(status.as_u16()))
            }
        }
    }

    async fn create_agency(&self, request: &AgencyUpsert, site: &str) -> bool {
        let url = match self.endpoint(&["agency", site, ""]) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("plainfees", "true");
                url
            }
            Err(e) => {
                tracing::error!("Cannot build agency create URL: {}", e);
                return false;
            }
        };
        tracing::info!(
            "Creating agency in booking system: site={}, agency={:?}",
            site,
            request.external_id
        );

        self.write(url, reqwest::Method::POST, request, site).await
    }

    async fn update_agency(&self, request: &AgencyUpsert, site: &str) -> bool {
        let url = match self.endpoint(&["agency", site, ""]) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("plainfees", "true");
                url
            }
            Err(e) => {
                tracing::error!("Cannot build agency update URL: {}", e);
                return false;
            }
        };
        tracing::info!(
            "Updating agency in booking system: site={}, agency={:?}",
            site,
            request.external_id
        );

        self.write(url, reqwest::Method::PUT, request, site).await
    }

    async fn user_exists(&self, site: &str, agency_number: &str, user_id: &str) -> bool {
        let url = match self.endpoint(&["user", site, agency_number, user_id]) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot build user lookup URL: {}", e);
                return false;
            }
        };
        tracing::debug!(
            "Checking user existence: site={}, agency={}, user={}",
            site,
            agency_number,
            user_id
        );

        let token = match self.bearer(site).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Cannot authenticate user lookup: {}", e);
                return false;
            }
        };

        match self
            .http_client
            .get(url)
            .header(AUTH_TOKEN_HEADER, token)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::error!("Error checking user existence: {}", e);
                false
            }
        }
    }

    async fn create_user(&self, request: &UserCreate, site: &str) -> bool {
        let agency = request.agency.as_deref().unwrap_or("");
        let url = match self.endpoint(&["user", site, agency]) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot build user create URL: {}", e);
                return false;
            }
        };
        tracing::info!(
            "Creating user in booking system: site={}, agency={}, username={}",
            site,
            agency,
            request.username
        );

        self.write(url, reqwest::Method::POST, request, site).await
    }
}

impl BookingClient {
    async fn write<T: serde::Serialize + Sync>(
        &self,
        url: Url,
        method: reqwest::Method,
        body: &T,
        site: &str,
    ) -> bool {
        let token = match self.bearer(site).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Cannot authenticate booking write: {}", e);
                return false;
            }
        };

        match self
            .http_client
            .request(method, url)
            .header(AUTH_TOKEN_HEADER, token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
        {
            Ok(response) => {
                let success = response.status() == StatusCode::OK;
                tracing::info!(
                    "Booking write result: {}",
                    if success { "SUCCESS" } else { "FAILED" }
                );
                success
            }
            Err(e) => {
                tracing::error!("Error writing to booking system: {}", e);
                false
            }
        }
    }
}

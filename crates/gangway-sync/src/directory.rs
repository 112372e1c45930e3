//! Directory-system client.
//!
//! The directory is the source of truth for agency business data. It is
//! read-only from the bridge's point of view: one bearer-authenticated
//! lookup by agency number, where the bearer is a short-lived self-signed
//! assertion minted per call.

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use gangway_auth::{AssertionSigner, ClientTimeouts};
use gangway_core::DirectoryAgency;

/// Errors from directory-system reads.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The call returned an unexpected non-success status.
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// The bearer assertion could not be signed.
    #[error("Assertion signing failed: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    /// The base URL rejected a path segment (cannot-be-a-base URL).
    #[error("Invalid directory API base URL")]
    InvalidBaseUrl,
}

/// Contract the reconciliation orchestrator requires from the directory
/// system.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Fetches the agency's directory record; `None` means the agency is
    /// unknown to the directory.
    async fn agency_record(
        &self,
        agency_number: &str,
    ) -> Result<Option<DirectoryAgency>, DirectoryError>;
}

/// HTTP implementation of [`DirectoryApi`].
pub struct DirectoryClient {
    http_client: reqwest::Client,
    base_url: Url,
    signer: AssertionSigner,
}

impl DirectoryClient {
    /// Creates a client for the directory API rooted at `base_url`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// practice).
    #[must_use]
    pub fn new(base_url: Url, signer: AssertionSigner) -> Self {
        Self {
            http_client: ClientTimeouts::default().client(),
            base_url,
            signer,
        }
    }

    /// Overrides the HTTP client timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: ClientTimeouts) -> Self {
        self.http_client = timeouts.client();
        self
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    async fn agency_record(
        &self,
        agency_number: &str,
    ) -> Result<Option<DirectoryAgency>, DirectoryError> {
        if agency_number.trim().is_empty() {
            tracing::warn!("Agency number is empty, skipping directory lookup");
            return Ok(None);
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| DirectoryError::InvalidBaseUrl)?
            .pop_if_empty()
            .push(agency_number);
        tracing::debug!("Fetching directory agency record: {}", url);

        let assertion = self.signer.generate()?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(assertion)
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::info!("Agency not found in directory: agency={}", agency_number);
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => {
                tracing::error!(
                    "Directory read failed for agency {}: HTTP {}",
                    agency_number,
                    status
                );
                Err(DirectoryError::Http(status.as_u16()))
            }
        }
    }
}

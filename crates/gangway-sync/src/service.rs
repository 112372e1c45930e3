//! Reconciliation orchestrator.
//!
//! [`HandoffService`] drives the whole handoff: validate the inbound token,
//! resolve the target microsite, derive the sign-in secret, reconcile the
//! agency and user into the booking system, and assemble the redirect
//! outcome.
//!
//! Reconciliation is best-effort on purpose. A failed agency sync or user
//! create degrades the outcome (the caller may land on a login page) but
//! never aborts the handoff; only token rejection and redirect assembly
//! failures are hard errors.

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use gangway_auth::{TokenError, TokenValidator};
use gangway_core::{
    AgencyStatus, AgencyUpsert, AuthenticationOutcome, Claims, MicrositeTarget, RedirectError,
    UserCreate, build_redirect_url, derive_secret,
};

use crate::booking::BookingSystem;
use crate::directory::DirectoryApi;
use crate::microsite::MicrositeStore;

/// Language code applied when the requested one is absent or unusable.
const DEFAULT_LANGUAGE: &str = "DE";

static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("invalid language regex"));

static TRIP_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,30}$").expect("invalid trip type regex"));

/// Hard failures of the handoff.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    /// No token was supplied.
    #[error("Missing authentication token")]
    EmptyToken,

    /// The token failed validation.
    #[error("Token rejected: {0}")]
    TokenRejected(#[from] TokenError),

    /// The redirect URL could not be assembled.
    #[error("Redirect assembly failed: {0}")]
    Redirect(#[from] RedirectError),
}

/// Source of validated claims for a raw token.
///
/// Seam over [`TokenValidator`] so the orchestrator can be exercised
/// without a key server.
#[async_trait]
pub trait ClaimsSource: Send + Sync {
    async fn claims(&self, raw_token: &str) -> Result<Claims, TokenError>;
}

#[async_trait]
impl ClaimsSource for TokenValidator {
    async fn claims(&self, raw_token: &str) -> Result<Claims, TokenError> {
        self.validate(raw_token).await
    }
}

/// The reconciliation orchestrator.
pub struct HandoffService {
    claims_source: Arc<dyn ClaimsSource>,
    microsites: Arc<dyn MicrositeStore>,
    fallback: MicrositeTarget,
    booking: Arc<dyn BookingSystem>,
    directory: Arc<dyn DirectoryApi>,
}

impl HandoffService {
    #[must_use]
    pub fn new(
        claims_source: Arc<dyn ClaimsSource>,
        microsites: Arc<dyn MicrositeStore>,
        fallback: MicrositeTarget,
        booking: Arc<dyn BookingSystem>,
        directory: Arc<dyn DirectoryApi>,
    ) -> Self {
        Self {
            claims_source,
            microsites,
            fallback,
            booking,
            directory,
        }
    }

    /// Runs the full handoff for one inbound request.
    ///
    /// # Errors
    ///
    /// Fails only on a missing/rejected token or unusable redirect base;
    /// every reconciliation problem is reported inside the outcome instead.
    pub async fn authenticate(
        &self,
        raw_token: &str,
        language: Option<&str>,
        trip_type: Option<&str>,
    ) -> Result<AuthenticationOutcome, HandoffError> {
        if raw_token.trim().is_empty() {
            return Err(HandoffError::EmptyToken);
        }

        let language = normalize_language(language);
        let trip_type = normalize_trip_type(trip_type);

        let claims = self.claims_source.claims(raw_token).await?;
        tracing::info!(
            "Token validated: agency={}, company={}, job={}",
            claims.agency_number(),
            claims.company_code(),
            claims.job_id()
        );

        let target = self.resolve_target(claims.company_code()).await;
        let secret = derive_secret(claims.job_id(), claims.agency_number());

        let agency_status = self.check_agency_status(&target, &claims).await;
        if matches!(agency_status, AgencyStatus::Inactive | AgencyStatus::NotFound) {
            self.sync_agency(&target, &claims, agency_status).await;
        }

        let user_status = self.ensure_user(&target, &claims).await;

        let redirect = build_redirect_url(
            &target.base_url,
            &language,
            &trip_type,
            claims.job_id(),
            &secret,
            claims.agency_number(),
        )?;

        Ok(AuthenticationOutcome {
            success: true,
            message: "Authentication successful".to_string(),
            agent_first_name: claims.agent_first_name.clone(),
            agent_last_name: claims.agent_last_name.clone(),
            agency_number: claims.agency_number.clone(),
            company_code: claims.company_code.clone(),
            role: claims.role.clone(),
            job_id: claims.job_id.clone(),
            language,
            trip_type,
            microsite_url: Some(redirect.to_string()),
            microsite_name: target.display_name.clone(),
            microsite: Some(target.site.clone()),
            microsite_api: Some(target.api_site.clone()),
            encrypted_password: Some(secret),
            agency_status: Some(agency_status.as_str().to_string()),
            agency_status_description: Some(agency_status.description().to_string()),
            user_status: Some(user_status),
        })
    }

    /// Resolves the microsite for the claimed business unit, falling back
    /// to the configured default target for unmapped codes.
    async fn resolve_target(&self, company_code: &str) -> MicrositeTarget {
        match self.microsites.lookup(company_code).await {
            Some(target) => target,
            None => {
                tracing::warn!(
                    "No microsite mapped for company code '{}', using fallback",
                    company_code
                );
                self.fallback.clone()
            }
        }
    }

    /// Determines the agency's live status in the booking system.
    ///
    /// Status reads go through the target's API site key, not the portal
    /// site key used for sync writes.
    async fn check_agency_status(&self, target: &MicrositeTarget, claims: &Claims) -> AgencyStatus {
        match self
            .booking
            .agency(&target.api_site, claims.agency_number())
            .await
        {
            Ok(Some(agency)) if agency.is_active() => AgencyStatus::Active,
            Ok(Some(_)) => AgencyStatus::Inactive,
            Ok(None) => AgencyStatus::NotFound,
            Err(e) => {
                tracing::error!("Agency status check failed: {}", e);
                AgencyStatus::Error
            }
        }
    }

    /// Pushes the directory's agency record into the booking system,
    /// creating or updating depending on `status`, then verifies the
    /// agency is readable afterwards. Best-effort; returns whether the
    /// sync verifiably succeeded.
    async fn sync_agency(
        &self,
        target: &MicrositeTarget,
        claims: &Claims,
        status: AgencyStatus,
    ) -> bool {
        let agency_number = claims.agency_number();

        let record = match self.directory.agency_record(agency_number).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(
                    "Agency {} has no directory record, skipping sync",
                    agency_number
                );
                return false;
            }
            Err(e) => {
                tracing::error!("Directory lookup failed for agency {}: {}", agency_number, e);
                return false;
            }
        };

        let request = AgencyUpsert::from_directory(&record);
        let written = match status {
            AgencyStatus::NotFound => self.booking.create_agency(&request, &target.site).await,
            _ => self.booking.update_agency(&request, &target.site).await,
        };
        if !written {
            tracing::error!("Agency sync write failed for agency {}", agency_number);
            return false;
        }

        // Trust the re-fetch, not the write status.
        match self.booking.agency(&target.site, agency_number).await {
            Ok(Some(_)) => {
                tracing::info!("Agency {} synced and verified", agency_number);
                true
            }
            Ok(None) => {
                tracing::error!("Agency {} not readable after sync", agency_number);
                false
            }
            Err(e) => {
                tracing::error!("Agency {} sync verification failed: {}", agency_number, e);
                false
            }
        }
    }

    /// Ensures the token's user exists in the booking system, creating it
    /// from the directory record when missing. Best-effort.
    async fn ensure_user(&self, target: &MicrositeTarget, claims: &Claims) -> bool {
        let agency_number = claims.agency_number();
        let job_id = claims.job_id();

        if self
            .booking
            .user_exists(&target.site, agency_number, job_id)
            .await
        {
            return true;
        }

        let record = match self.directory.agency_record(agency_number).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(
                    "No directory record for agency {}, cannot create user {}",
                    agency_number,
                    job_id
                );
                return false;
            }
            Err(e) => {
                tracing::error!("Directory lookup failed creating user {}: {}", job_id, e);
                return false;
            }
        };

        let request = UserCreate::from_claims(claims, &record);
        let created = self.booking.create_user(&request, &target.site).await;
        if !created {
            tracing::error!("User create failed: agency={}, user={}", agency_number, job_id);
        }
        created
    }
}

/// Normalises a requested language to a two-letter uppercase code,
/// defaulting to `DE`.
///
/// Region suffixes are dropped by truncation (`de-DE` becomes `DE`);
/// anything that is not two ASCII letters after truncation falls back to
/// the default.
fn normalize_language(language: Option<&str>) -> String {
    let Some(language) = language else {
        return DEFAULT_LANGUAGE.to_string();
    };

    let truncated: String = language.trim().chars().take(2).collect();
    if LANGUAGE_RE.is_match(&truncated) {
        truncated.to_ascii_uppercase()
    } else {
        DEFAULT_LANGUAGE.to_string()
    }
}

/// Normalises a requested trip type: accepted as-is when it is a short
/// alphanumeric token (underscores and dashes allowed), otherwise reduced
/// to its alphanumeric characters. Absent means empty.
fn normalize_trip_type(trip_type: Option<&str>) -> String {
    let Some(trip_type) = trip_type else {
        return String::new();
    };

    let trimmed = trip_type.trim();
    if TRIP_TYPE_RE.is_match(trimmed) {
        trimmed.to_string()
    } else {
        trimmed.chars().filter(char::is_ascii_alphanumeric).collect()
    }
}

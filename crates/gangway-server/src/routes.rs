//! HTTP handlers for the handoff endpoints.
//!
//! The browser-facing endpoint answers with a `302` to the assembled
//! microsite URL on success and a small static HTML page on failure. The
//! `/json` variant returns the full outcome document and exists for
//! integration debugging.

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Deserialize;

use gangway_core::AuthenticationOutcome;
use gangway_sync::HandoffError;

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct AuthenticateQuery {
    pub jwt: Option<String>,
    pub lang: Option<String>,
    #[serde(rename = "type")]
    pub trip_type: Option<String>,
}

/// `GET /user/authenticate` - browser entry point.
pub async fn authenticate(
    State(state): State<AppState>,
    Query(query): Query<AuthenticateQuery>,
) -> Response {
    match run_handoff(&state, &query).await {
        Ok(outcome) => {
            let location = outcome.microsite_url.unwrap_or_default();
            tracing::info!("Redirecting agent to {}", location);
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Err(e) => {
            tracing::warn!("Handoff failed: {}", e);
            (StatusCode::BAD_REQUEST, Html(error_page(&e.to_string()))).into_response()
        }
    }
}

/// `GET /user/authenticate/json` - outcome document for debugging.
pub async fn authenticate_json(
    State(state): State<AppState>,
    Query(query): Query<AuthenticateQuery>,
) -> Response {
    match run_handoff(&state, &query).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            tracing::warn!("Handoff failed: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(AuthenticationOutcome::failure(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn run_handoff(
    state: &AppState,
    query: &AuthenticateQuery,
) -> Result<AuthenticationOutcome, HandoffError> {
    state
        .handoff
        .authenticate(
            query.jwt.as_deref().unwrap_or(""),
            query.lang.as_deref(),
            query.trip_type.as_deref(),
        )
        .await
}

fn error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Sign-in failed</title>
</head>
<body>
  <h1>Sign-in failed</h1>
  <p>{}</p>
  <p>Please return to the portal and try again.</p>
</body>
</html>
"#,
        escape_html(message)
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use gangway_auth::TokenError;
    use gangway_core::{BookingAgency, Claims, MicrositeTarget};
    use gangway_sync::booking::{BookingError, BookingSystem};
    use gangway_sync::directory::{DirectoryApi, DirectoryError};
    use gangway_sync::service::ClaimsSource;
    use gangway_sync::{HandoffService, StaticMicrositeStore};

    struct StubClaims;

    #[async_trait]
    impl ClaimsSource for StubClaims {
        async fn claims(&self, raw_token: &str) -> Result<Claims, TokenError> {
            if raw_token == "good" {
                Ok(serde_json::from_value(serde_json::json!({
                    "agencyNumber": "12345",
                    "companyCode": "NORD",
                    "jobId": "4711",
                }))
                .unwrap())
            } else {
                Err(TokenError::SignatureInvalid)
            }
        }
    }

    struct StubBooking;

    #[async_trait]
    impl BookingSystem for StubBooking {
        async fn agency(
            &self,
            _site: &str,
            _agency_number: &str,
        ) -> Result<Option<BookingAgency>, BookingError> {
            Ok(Some(BookingAgency {
                active: Some("true".to_string()),
                ..BookingAgency::default()
            }))
        }

        async fn create_agency(&self, _r: &gangway_core::AgencyUpsert, _site: &str) -> bool {
            true
        }

        async fn update_agency(&self, _r: &gangway_core::AgencyUpsert, _site: &str) -> bool {
            true
        }

        async fn user_exists(&self, _site: &str, _agency: &str, _user: &str) -> bool {
            true
        }

        async fn create_user(&self, _r: &gangway_core::UserCreate, _site: &str) -> bool {
            true
        }
    }

    struct StubDirectory;

    #[async_trait]
    impl DirectoryApi for StubDirectory {
        async fn agency_record(
            &self,
            _agency_number: &str,
        ) -> Result<Option<gangway_core::DirectoryAgency>, DirectoryError> {
            Ok(None)
        }
    }

    fn state() -> AppState {
        let fallback = MicrositeTarget {
            base_url: "https://www.example.travel".to_string(),
            display_name: None,
            site: "main".to_string(),
            api_site: "main-api".to_string(),
        };
        let handoff = HandoffService::new(
            Arc::new(StubClaims),
            Arc::new(StaticMicrositeStore::default()),
            fallback,
            Arc::new(StubBooking),
            Arc::new(StubDirectory),
        );
        AppState {
            handoff: Arc::new(handoff),
        }
    }

    fn query(jwt: Option<&str>) -> AuthenticateQuery {
        AuthenticateQuery {
            jwt: jwt.map(ToString::to_string),
            lang: Some("de".to_string()),
            trip_type: Some("SINGLE".to_string()),
        }
    }

    #[tokio::test]
    async fn successful_handoff_redirects() {
        let response = authenticate(State(state()), Query(query(Some("good")))).await;

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://www.example.travel/DE/home?tripType=SINGLE"));
        assert!(location.contains("agency=12345"));
    }

    #[tokio::test]
    async fn rejected_token_renders_error_page() {
        let response = authenticate(State(state()), Query(query(Some("forged")))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Sign-in failed"));
        assert!(body.contains("signature"));
    }

    #[tokio::test]
    async fn missing_token_is_a_bad_request() {
        let response = authenticate(State(state()), Query(query(None))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn json_variant_returns_outcome_document() {
        let response = authenticate_json(State(state()), Query(query(Some("good")))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["agencyStatus"], "ACTIVE");
        assert_eq!(json["type"], "SINGLE");
    }

    #[tokio::test]
    async fn json_variant_reports_failures() {
        let response = authenticate_json(State(state()), Query(query(Some("forged")))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
    }

    #[test]
    fn error_page_escapes_markup() {
        let page = error_page("<script>alert(1)</script>");
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }
}

//! Data model shared across the bridge.
//!
//! Wire field names follow the remote systems exactly, so the serde
//! attributes here are part of the contract and must not be "cleaned up".

use serde::{Deserialize, Deserializer, Serialize};

/// Claim set extracted from a validated agent token.
///
/// All fields are optional at the type level; the orchestrator treats
/// missing routing fields as empty strings rather than rejecting, matching
/// the permissive behaviour of the upstream token issuer. Instances are
/// produced by the token validator and never mutated afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,

    #[serde(rename = "agencyNumber")]
    pub agency_number: Option<String>,

    #[serde(rename = "companyCode")]
    pub company_code: Option<String>,

    /// Issued as either a JSON string or a bare number depending on the
    /// token source; numbers are stringified on the way in.
    #[serde(rename = "jobId", default, deserialize_with = "string_or_number")]
    pub job_id: Option<String>,

    pub role: Option<String>,
    pub iss: Option<String>,
    pub aud: Option<String>,
    pub jti: Option<String>,

    #[serde(rename = "agentFirstName")]
    pub agent_first_name: Option<String>,

    #[serde(rename = "agentLastName")]
    pub agent_last_name: Option<String>,

    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub nbf: Option<i64>,
}

impl Claims {
    /// Agency number, empty when the claim is absent.
    #[must_use]
    pub fn agency_number(&self) -> &str {
        self.agency_number.as_deref().unwrap_or("")
    }

    /// Business-unit code selecting the target microsite.
    #[must_use]
    pub fn company_code(&self) -> &str {
        self.company_code.as_deref().unwrap_or("")
    }

    /// Job id, used as the booking-system username.
    #[must_use]
    pub fn job_id(&self) -> &str {
        self.job_id.as_deref().unwrap_or("")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }))
}

/// Live status of an agency in the booking system.
///
/// Always derived fresh from the booking system's agency record, never
/// cached across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgencyStatus {
    /// Agency exists and is active.
    Active,
    /// Agency exists but is inactive and needs an update.
    Inactive,
    /// Agency does not exist in the booking system.
    NotFound,
    /// The status check itself failed.
    Error,
}

impl AgencyStatus {
    /// Wire name of the status, as reported in the outcome document.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::NotFound => "NOT_FOUND",
            Self::Error => "ERROR",
        }
    }

    /// Human-readable description for the outcome document.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Active => "Agency exists and is active",
            Self::Inactive => "Agency exists but is inactive - needs update",
            Self::NotFound => "Agency not found in the booking system",
            Self::Error => "Error occurred while checking agency status",
        }
    }
}

impl std::fmt::Display for AgencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved microsite target for a business-unit code.
///
/// Either looked up from the microsite store or assembled from the
/// configured fallback values when no mapping exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrositeTarget {
    /// Base URL the final redirect is built on.
    pub base_url: String,
    /// Display name, absent for the fallback target.
    pub display_name: Option<String>,
    /// Booking-system site key used in API paths and credential lookup.
    pub site: String,
    /// Booking-system API site key used for agency-status calls.
    pub api_site: String,
}

/// Agency record as returned by the booking system.
///
/// The booking system reports `active` as the string `"true"`/`"false"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingAgency {
    pub id: Option<String>,
    pub active: Option<String>,
    pub name: Option<String>,

    #[serde(rename = "addressText")]
    pub address_text: Option<String>,

    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,

    pub city: Option<String>,
    pub country: Option<String>,

    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,

    #[serde(rename = "documentNumber")]
    pub document_number: Option<String>,

    #[serde(rename = "contactPersonName")]
    pub contact_person_name: Option<String>,

    #[serde(rename = "contactPersonLastName")]
    pub contact_person_last_name: Option<String>,

    pub email: Option<String>,

    #[serde(rename = "businessName")]
    pub business_name: Option<String>,

    pub taxes: Option<String>,

    #[serde(rename = "invoiceType")]
    pub invoice_type: Option<String>,
}

impl BookingAgency {
    /// Whether the booking system considers this agency active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("true"))
    }
}

/// Agency record as returned by the directory system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryAgency {
    #[serde(rename = "agencyNumber")]
    pub agency_number: Option<String>,

    #[serde(rename = "companyName")]
    pub company_name: Option<String>,

    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,

    #[serde(rename = "taxNumber")]
    pub tax_number: Option<String>,

    pub iban: Option<String>,
    pub bic: Option<String>,

    #[serde(rename = "valueAddedTaxId")]
    pub value_added_tax_id: Option<String>,

    #[serde(rename = "bankName")]
    pub bank_name: Option<String>,

    #[serde(rename = "collectionMethod")]
    pub collection_method: Option<String>,

    #[serde(rename = "companyShortCode")]
    pub company_short_code: Option<String>,

    pub chain: Option<String>,
}

/// Fixed business name stamped on agencies synced into the booking system.
pub const SYNCED_AGENCY_BUSINESS_NAME: &str = "Gangway Travel Group";

/// Roles assigned to users created in the booking system.
pub const SYNCED_USER_ROLES: [&str; 2] = ["user", "agent"];

/// Agency create/update request accepted by the booking system.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgencyUpsert {
    #[serde(rename = "externalId")]
    pub external_id: Option<String>,

    pub companyname: Option<String>,

    #[serde(rename = "addressText")]
    pub address_text: Option<String>,

    pub city: Option<String>,

    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,

    pub country: Option<String>,
    pub email: Option<String>,

    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,

    pub taxes: String,
    pub active: String,

    #[serde(rename = "documentNumber")]
    pub document_number: String,

    #[serde(rename = "contactPersonName")]
    pub contact_person_name: String,

    #[serde(rename = "contactPersonLastName")]
    pub contact_person_last_name: String,

    #[serde(rename = "businessName")]
    pub business_name: String,

    #[serde(rename = "invoiceType")]
    pub invoice_type: String,

    #[serde(rename = "BIC")]
    pub bic: Option<String>,

    #[serde(rename = "IBAN")]
    pub iban: Option<String>,

    #[serde(rename = "bankName")]
    pub bank_name: Option<String>,

    #[serde(rename = "collectionMethod")]
    pub collection_method: Option<String>,

    #[serde(rename = "companyShortCode")]
    pub company_short_code: Option<String>,

    pub chain: Option<String>,

    #[serde(rename = "taxNumber")]
    pub tax_number: Option<String>,

    #[serde(rename = "valueAddedTaxId")]
    pub value_added_tax_id: Option<String>,
}

impl AgencyUpsert {
    /// Translates a directory record into the booking system's shape.
    ///
    /// Fields the directory does not carry are filled with the booking
    /// system's required defaults (active, net invoicing, placeholder
    /// contact person).
    #[must_use]
    pub fn from_directory(record: &DirectoryAgency) -> Self {
        Self {
            external_id: record.agency_number.clone(),
            companyname: record.company_name.clone(),
            address_text: record.address.clone(),
            city: record.city.clone(),
            postal_code: record.zip.clone(),
            country: record.country.clone(),
            email: record.email.clone(),
            phone_number: record.phone.clone(),
            taxes: "0".to_string(),
            active: "true".to_string(),
            document_number: "-".to_string(),
            contact_person_name: "-".to_string(),
            contact_person_last_name: "-".to_string(),
            business_name: SYNCED_AGENCY_BUSINESS_NAME.to_string(),
            invoice_type: "NET".to_string(),
            bic: record.bic.clone(),
            iban: record.iban.clone(),
            bank_name: record.bank_name.clone(),
            collection_method: record.collection_method.clone(),
            company_short_code: record.company_short_code.clone(),
            chain: record.chain.clone(),
            tax_number: record.tax_number.clone(),
            value_added_tax_id: record.value_added_tax_id.clone(),
        }
    }
}

/// User create request accepted by the booking system.
#[derive(Debug, Clone, Serialize)]
pub struct UserCreate {
    pub username: String,
    /// Always blank; the user signs in with the derived secret instead.
    pub password: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub roles: Vec<String>,
    pub email: Option<String>,
    pub agency: Option<String>,
    pub active: String,
}

impl UserCreate {
    /// Builds a user-create request from token claims and the agency's
    /// directory record.
    #[must_use]
    pub fn from_claims(claims: &Claims, record: &DirectoryAgency) -> Self {
        Self {
            username: claims.job_id().to_string(),
            password: String::new(),
            name: claims.agent_first_name.clone(),
            surname: claims.agent_last_name.clone(),
            roles: SYNCED_USER_ROLES.iter().map(ToString::to_string).collect(),
            email: record.email.clone(),
            agency: record.agency_number.clone(),
            active: "true".to_string(),
        }
    }
}

/// Final outcome of an authentication/reconciliation run.
///
/// Serialized as the caller-facing JSON document; field names are part of
/// the external contract.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOutcome {
    pub success: bool,
    pub message: String,
    pub agent_first_name: Option<String>,
    pub agent_last_name: Option<String>,
    pub agency_number: Option<String>,
    pub company_code: Option<String>,
    pub role: Option<String>,
    pub job_id: Option<String>,
    pub language: String,
    #[serde(rename = "type")]
    pub trip_type: String,

    /// The fully assembled redirect URL.
    pub microsite_url: Option<String>,
    pub microsite_name: Option<String>,
    pub microsite: Option<String>,
    pub microsite_api: Option<String>,

    pub encrypted_password: Option<String>,

    pub agency_status: Option<String>,
    pub agency_status_description: Option<String>,

    /// Whether the user is available in the booking system after
    /// reconciliation (existing or freshly created).
    pub user_status: Option<bool>,
}

impl AuthenticationOutcome {
    /// Failure outcome carrying only a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_job_id_accepts_string_and_number() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "jobId": "4711",
            "agencyNumber": "12345"
        }))
        .unwrap();
        assert_eq!(claims.job_id(), "4711");

        let claims: Claims = serde_json::from_value(serde_json::json!({
            "jobId": 4711
        }))
        .unwrap();
        assert_eq!(claims.job_id(), "4711");
    }

    #[test]
    fn claims_missing_fields_default_to_empty() {
        let claims: Claims = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(claims.agency_number(), "");
        assert_eq!(claims.company_code(), "");
        assert_eq!(claims.job_id(), "");
        assert!(claims.nbf.is_none());
    }

    #[test]
    fn booking_agency_active_is_string_typed() {
        let agency: BookingAgency =
            serde_json::from_value(serde_json::json!({"active": "TRUE"})).unwrap();
        assert!(agency.is_active());

        let agency: BookingAgency =
            serde_json::from_value(serde_json::json!({"active": "false"})).unwrap();
        assert!(!agency.is_active());

        let agency = BookingAgency::default();
        assert!(!agency.is_active());
    }

    #[test]
    fn agency_upsert_carries_booking_defaults() {
        let record = DirectoryAgency {
            agency_number: Some("12345".to_string()),
            company_name: Some("Reisebüro Nord".to_string()),
            zip: Some("20095".to_string()),
            ..DirectoryAgency::default()
        };

        let upsert = AgencyUpsert::from_directory(&record);
        assert_eq!(upsert.external_id.as_deref(), Some("12345"));
        assert_eq!(upsert.postal_code.as_deref(), Some("20095"));
        assert_eq!(upsert.active, "true");
        assert_eq!(upsert.taxes, "0");
        assert_eq!(upsert.invoice_type, "NET");
        assert_eq!(upsert.document_number, "-");
        assert_eq!(upsert.business_name, SYNCED_AGENCY_BUSINESS_NAME);
    }

    #[test]
    fn agency_upsert_wire_names() {
        let upsert = AgencyUpsert::from_directory(&DirectoryAgency {
            iban: Some("DE02120300000000202051".to_string()),
            ..DirectoryAgency::default()
        });
        let json = serde_json::to_value(&upsert).unwrap();
        assert_eq!(json["IBAN"], "DE02120300000000202051");
        assert!(json.get("externalId").is_some());
        assert!(json.get("invoiceType").is_some());
    }

    #[test]
    fn user_create_from_claims() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "jobId": 77,
            "agentFirstName": "Jana",
            "agentLastName": "Berg"
        }))
        .unwrap();
        let record = DirectoryAgency {
            agency_number: Some("9001".to_string()),
            email: Some("office@agency.example".to_string()),
            ..DirectoryAgency::default()
        };

        let user = UserCreate::from_claims(&claims, &record);
        assert_eq!(user.username, "77");
        assert_eq!(user.password, "");
        assert_eq!(user.active, "true");
        assert_eq!(user.roles, vec!["user", "agent"]);
        assert_eq!(user.agency.as_deref(), Some("9001"));
        assert_eq!(user.email.as_deref(), Some("office@agency.example"));
    }

    #[test]
    fn agency_status_wire_names_and_descriptions() {
        assert_eq!(AgencyStatus::Active.as_str(), "ACTIVE");
        assert_eq!(AgencyStatus::NotFound.as_str(), "NOT_FOUND");
        assert_eq!(
            AgencyStatus::Inactive.description(),
            "Agency exists but is inactive - needs update"
        );
    }

    #[test]
    fn outcome_serializes_camel_case() {
        let outcome = AuthenticationOutcome {
            success: true,
            message: "ok".to_string(),
            agency_status: Some("ACTIVE".to_string()),
            trip_type: "SINGLE".to_string(),
            user_status: Some(true),
            ..AuthenticationOutcome::default()
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["agencyStatus"], "ACTIVE");
        assert_eq!(json["type"], "SINGLE");
        assert_eq!(json["userStatus"], true);
    }
}

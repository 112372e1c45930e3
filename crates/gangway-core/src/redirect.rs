//! Assembly of the final microsite redirect URL.
//!
//! All values arriving here are already normalised by the orchestrator;
//! this module does no sanitisation of its own and only performs typed URL
//! construction (percent-encoding via [`url::Url`]).

use url::Url;

/// Errors from redirect URL assembly.
#[derive(Debug, thiserror::Error)]
pub enum RedirectError {
    /// The configured base URL does not parse.
    #[error("Invalid redirect base URL: {0}")]
    InvalidBase(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. a `mailto:` URL).
    #[error("Redirect base URL cannot carry path segments")]
    OpaqueBase,
}

/// Builds the redirect URL `{base}/{language}/home` with the handoff query
/// parameters attached.
pub fn build_redirect_url(
    base_url: &str,
    language: &str,
    trip_type: &str,
    user: &str,
    secret: &str,
    agency_number: &str,
) -> Result<Url, RedirectError> {
    let mut url = Url::parse(base_url)?;

    url.path_segments_mut()
        .map_err(|()| RedirectError::OpaqueBase)?
        .pop_if_empty()
        .extend([language, "home"]);

    url.query_pairs_mut()
        .append_pair("tripType", trip_type)
        .append_pair("submit", "true")
        .append_pair("user", user)
        .append_pair("password", secret)
        .append_pair("agency", agency_number);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_url() {
        let url = build_redirect_url(
            "https://de.example.travel/",
            "DE",
            "SINGLE",
            "4711",
            "9c4faae4c7333a81aae8092e12c506f0",
            "12345",
        )
        .unwrap();

        assert_eq!(
            url.as_str(),
            "https://de.example.travel/DE/home?tripType=SINGLE&submit=true&user=4711&password=9c4faae4c7333a81aae8092e12c506f0&agency=12345"
        );
    }

    #[test]
    fn trailing_slash_does_not_double_segments() {
        let with_slash =
            build_redirect_url("https://de.example.travel/", "DE", "", "u", "s", "a").unwrap();
        let without_slash =
            build_redirect_url("https://de.example.travel", "DE", "", "u", "s", "a").unwrap();
        assert_eq!(with_slash, without_slash);
        assert_eq!(with_slash.path(), "/DE/home");
    }

    #[test]
    fn query_values_are_percent_encoded() {
        // Upstream normalisation should prevent these values, but the URL
        // type still encodes whatever it is handed.
        let url =
            build_redirect_url("https://de.example.travel", "DE", "A B", "u", "s", "a").unwrap();
        assert!(url.as_str().contains("tripType=A+B"));
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(matches!(
            build_redirect_url("not a url", "DE", "", "u", "s", "a"),
            Err(RedirectError::InvalidBase(_))
        ));
    }
}

//! Business-unit-code to microsite resolution.
//!
//! Tokens carry a company code naming the business unit the caller belongs
//! to. Each business unit maps to a booking-system microsite (its own base
//! URL and site identifiers). The mapping is configuration data, loaded once
//! at startup.

use std::collections::HashMap;

use async_trait::async_trait;

use gangway_core::MicrositeTarget;

/// Resolves a business-unit company code to its microsite target.
#[async_trait]
pub trait MicrositeStore: Send + Sync {
    /// Looks up the microsite for `company_code`; `None` when the code is
    /// unmapped.
    async fn lookup(&self, company_code: &str) -> Option<MicrositeTarget>;
}

/// In-memory [`MicrositeStore`] built from configuration.
///
/// Lookups are case-insensitive on the company code.
#[derive(Debug, Default)]
pub struct StaticMicrositeStore {
    targets: HashMap<String, MicrositeTarget>,
}

impl StaticMicrositeStore {
    /// Builds the store from `(company_code, target)` pairs.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (String, MicrositeTarget)>) -> Self {
        let targets = entries
            .into_iter()
            .map(|(code, target)| (code.trim().to_ascii_uppercase(), target))
            .collect();
        Self { targets }
    }

    /// Number of mapped business units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[async_trait]
impl MicrositeStore for StaticMicrositeStore {
    async fn lookup(&self, company_code: &str) -> Option<MicrositeTarget> {
        self.targets
            .get(&company_code.trim().to_ascii_uppercase())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(site: &str) -> MicrositeTarget {
        MicrositeTarget {
            base_url: format!("https://{site}.example.com"),
            display_name: Some(format!("{site} portal")),
            site: site.to_string(),
            api_site: format!("{site}-api"),
        }
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let store = StaticMicrositeStore::new([("nord".to_string(), target("nord"))]);

        let hit = store.lookup("NORD").await.unwrap();
        assert_eq!(hit.site, "nord");
        assert!(store.lookup(" nord ").await.is_some());
    }

    #[tokio::test]
    async fn unmapped_code_is_none() {
        let store = StaticMicrositeStore::new([("nord".to_string(), target("nord"))]);
        assert!(store.lookup("sued").await.is_none());
        assert!(store.lookup("").await.is_none());
    }
}

//! Component wiring and the HTTP server itself.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use url::Url;

use gangway_auth::{
    AssertionSigner, BookingTokenCache, ClientTimeouts, KeyCache, KeyCacheConfig, KeyEndpoints,
    KeyResolver, SiteCredentials, TokenValidator,
};
use gangway_core::MicrositeTarget;
use gangway_sync::{BookingClient, DirectoryClient, HandoffService, StaticMicrositeStore};

use crate::config::{AppConfig, ConfigError, MicrositeConfig};
use crate::routes;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub handoff: Arc<HandoffService>,
}

fn microsite_target(config: &MicrositeConfig) -> MicrositeTarget {
    MicrositeTarget {
        base_url: config.url.clone(),
        display_name: config.name.clone(),
        site: config.site.clone(),
        api_site: config.api_site.clone(),
    }
}

/// Builds the full component stack from configuration.
///
/// # Errors
///
/// Fails when a configured URL does not parse.
pub fn build_state(config: &AppConfig) -> Result<AppState, ConfigError> {
    let resolver = KeyResolver::new(KeyEndpoints {
        qa_url: config.keys.qa_url.clone(),
        stg_url: config.keys.stg_url.clone(),
        prod_url: config.keys.prod_url.clone(),
    });
    let key_cache = KeyCache::new(
        KeyCacheConfig::new()
            .with_connect_timeout(Duration::from_millis(config.keys.connect_timeout_ms))
            .with_read_timeout(Duration::from_millis(config.keys.read_timeout_ms)),
    );
    let validator = TokenValidator::new(resolver, Arc::new(key_cache));

    let credentials: HashMap<String, SiteCredentials> = config
        .booking
        .credentials
        .iter()
        .map(|(site, c)| {
            (
                site.clone(),
                SiteCredentials {
                    username: c.username.clone(),
                    password: c.password.clone(),
                },
            )
        })
        .collect();
    let booking_timeouts = ClientTimeouts::new()
        .with_connect_timeout(Duration::from_millis(config.booking.connect_timeout_ms))
        .with_read_timeout(Duration::from_millis(config.booking.read_timeout_ms));
    let tokens = BookingTokenCache::new(config.booking.auth_url.clone(), credentials)
        .with_ttl(Duration::from_secs(config.booking.token_ttl_secs))
        .with_timeouts(booking_timeouts);

    let booking_base = Url::parse(&config.booking.base_url)
        .map_err(|e| ConfigError::Invalid(format!("booking.base_url: {e}")))?;
    let booking = BookingClient::new(booking_base, Arc::new(tokens)).with_timeouts(booking_timeouts);

    let directory_base = Url::parse(&config.directory.base_url)
        .map_err(|e| ConfigError::Invalid(format!("directory.base_url: {e}")))?;
    let signer = AssertionSigner::new(
        config.directory.secret.clone(),
        config.directory.key_id.clone(),
        config.directory.audience.clone(),
    )
    .with_lifetime(Duration::from_secs(config.directory.assertion_lifetime_secs));
    let directory = DirectoryClient::new(directory_base, signer).with_timeouts(
        ClientTimeouts::new()
            .with_connect_timeout(Duration::from_millis(config.directory.connect_timeout_ms))
            .with_read_timeout(Duration::from_millis(config.directory.read_timeout_ms)),
    );

    let store = StaticMicrositeStore::new(
        config
            .microsites
            .map
            .iter()
            .map(|(code, target)| (code.clone(), microsite_target(target))),
    );
    tracing::info!("Loaded {} microsite mappings", store.len());

    let handoff = HandoffService::new(
        Arc::new(validator),
        Arc::new(store),
        microsite_target(&config.microsites.fallback),
        Arc::new(booking),
        Arc::new(directory),
    );

    Ok(AppState {
        handoff: Arc::new(handoff),
    })
}

/// Assembles the router.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/user/authenticate", get(routes::authenticate))
        .route("/user/authenticate/json", get(routes::authenticate_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct GangwayServer {
    addr: SocketAddr,
    app: Router,
}

impl GangwayServer {
    /// Builds the server from configuration.
    ///
    /// # Errors
    ///
    /// Fails when the configured component URLs are unusable.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let state = build_state(config)?;
        Ok(Self {
            addr: config.addr(),
            app: build_app(state),
        })
    }

    /// Binds the listen address and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound or the server aborts.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

//! # gangway-server
//!
//! HTTP entry point of the Gangway identity bridge: TOML configuration,
//! tracing setup, component wiring and the two handoff routes.

pub mod config;
pub mod routes;
pub mod server;

/// Initialises the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to the
/// whole binary.
pub fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

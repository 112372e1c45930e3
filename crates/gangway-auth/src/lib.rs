//! # gangway-auth
//!
//! Token validation and remote-system authentication for the Gangway
//! identity bridge.
//!
//! This crate provides:
//!
//! - [`keys`] - per-environment verification-key resolution and a
//!   process-lifetime key cache
//! - [`validator`] - parsing and signature validation of inbound agent
//!   tokens
//! - [`booking_token`] - a TTL-bounded bearer-token cache for the booking
//!   system's API
//! - [`assertion`] - short-lived self-signed assertions for the directory
//!   system's API
//! - [`http`] - shared connect/read timeout settings for outbound clients

pub mod assertion;
pub mod booking_token;
pub mod http;
pub mod keys;
pub mod validator;

pub use assertion::AssertionSigner;
pub use booking_token::{BookingTokenCache, BookingTokenError, SiteCredentials};
pub use http::ClientTimeouts;
pub use keys::{KeyCache, KeyCacheConfig, KeyEndpoints, KeyResolver};
pub use validator::{TokenError, TokenValidator};

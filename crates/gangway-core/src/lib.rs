//! # gangway-core
//!
//! Shared data model for the Gangway identity bridge.
//!
//! This crate holds the types that cross crate boundaries:
//!
//! - [`model`] - token claims, agency status, microsite targets, and the
//!   record/request shapes exchanged with the directory and booking systems
//! - [`credentials`] - deterministic derivation of the handoff secret
//! - [`redirect`] - assembly of the final microsite redirect URL

pub mod credentials;
pub mod model;
pub mod redirect;

pub use credentials::{derive_secret, verify_secret};
pub use model::{
    AgencyStatus, AgencyUpsert, AuthenticationOutcome, BookingAgency, Claims, DirectoryAgency,
    MicrositeTarget, UserCreate,
};
pub use redirect::{RedirectError, build_redirect_url};

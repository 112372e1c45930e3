//! # gangway-sync
//!
//! Remote-system clients and the reconciliation orchestrator for the
//! Gangway identity bridge.
//!
//! This crate provides:
//!
//! - [`booking`] - the booking-system client contract and its HTTP
//!   implementation
//! - [`directory`] - the directory-system client contract and its HTTP
//!   implementation
//! - [`microsite`] - the business-unit-code to microsite lookup store
//! - [`service`] - [`service::HandoffService`], the reconciliation state
//!   machine that turns a signed token into a redirect outcome

pub mod booking;
pub mod directory;
pub mod microsite;
pub mod service;

pub use booking::{BookingClient, BookingError, BookingSystem};
pub use directory::{DirectoryApi, DirectoryClient, DirectoryError};
pub use microsite::{MicrositeStore, StaticMicrositeStore};
pub use service::{ClaimsSource, HandoffError, HandoffService};

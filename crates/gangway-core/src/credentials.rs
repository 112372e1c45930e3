//! Deterministic derivation of the microsite handoff secret.
//!
//! The booking system has no shared session with the directory side, so the
//! bridge derives the user's password from identity fields instead of
//! storing it: the same inputs always produce the same secret, which lets
//! both sides recompute it independently.
//!
//! The scheme is fixed by the deployed credential format: MD5 over
//! `{jobId}_{agencyNumber}{suffix}`, hex-encoded lowercase. Changing it
//! would invalidate every previously provisioned booking-system user.

use md5::{Digest, Md5};

const SECRET_SUFFIX: &str = "_*seCrEt+";

/// Derives the handoff secret for a job id / agency number pair.
///
/// Inputs are trimmed; empty or missing values participate as empty
/// strings rather than failing. Pure and reproducible across processes.
#[must_use]
pub fn derive_secret(job_id: &str, agency_number: &str) -> String {
    let plain = format!("{}_{}{}", job_id.trim(), agency_number.trim(), SECRET_SUFFIX);
    hex::encode(Md5::digest(plain.as_bytes()))
}

/// Checks a candidate secret by re-deriving and comparing.
#[must_use]
pub fn verify_secret(candidate: &str, job_id: &str, agency_number: &str) -> bool {
    derive_secret(job_id, agency_number) == candidate
}

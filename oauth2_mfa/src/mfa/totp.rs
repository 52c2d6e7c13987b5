//! Time-based one-time code generation and validation.
//!
//! Pure functions of the shared secret, the candidate and the supplied
//! instant; callers pass the current time so outcomes are reproducible.

use totp_rs::{Algorithm, Secret, TOTP};

use super::config::TOTP_VERIFY_WINDOW;
use super::errors::MfaError;

const TOTP_DIGITS: usize = 6;
const TOTP_STEP_SECONDS: u64 = 30;

fn build_totp(secret: &str) -> Result<TOTP, MfaError> {
    let secret_bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| MfaError::TotpSecret(format!("{}", e)))?;

    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        *TOTP_VERIFY_WINDOW,
        TOTP_STEP_SECONDS,
        secret_bytes,
    )
    .map_err(|e| MfaError::TotpSecret(format!("{}", e)))
}

/// Generate the code for the time step containing `time` (seconds since the
/// Unix epoch). Used by issuance and testing paths, never by verification.
pub fn generate_totp_at(secret: &str, time: u64) -> Result<String, MfaError> {
    Ok(build_totp(secret)?.generate(time))
}

/// Check a candidate against the step containing `time` and the configured
/// skew window on either side, succeeding on the first match.
pub fn validate_totp_at(secret: &str, candidate: &str, time: u64) -> Result<bool, MfaError> {
    let totp = build_totp(secret)?;

    // Clean the code (remove spaces, dashes)
    let candidate = candidate.replace([' ', '-'], "");

    Ok(totp.check(&candidate, time))
}

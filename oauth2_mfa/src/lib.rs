//! oauth2_mfa - MFA verification and OAuth2 authorization-code issuance
//!
//! This crate provides the core protocol logic of an identity service's
//! authorization surface: multi-factor challenge verification (TOTP and
//! emailed one-time codes) gating sensitive account operations, and the
//! OAuth2 authorization-code step that lets a third-party client obtain a
//! scoped, time-boxed code on behalf of an authenticated user.
//!
//! Transport, request validation and token exchange live in the embedding
//! service; this crate is invoked as a library and returns discriminated
//! outcomes the boundary layer maps to responses.

mod coordination;
mod mfa;
mod oauth2;
mod storage;

#[cfg(test)]
mod test_utils;

// Re-export the main coordination components
pub use coordination::{
    authorize_core, authorize_core_at, require_mfa_core, verify_mfa_core, verify_mfa_core_at,
};

pub use mfa::{
    EmailInfo, FieldLocation, FieldLocator, MfaError, MfaFactor, MfaOutcome, MfaStatus, MfaStore,
    OutcomeSeverity, TotpStatus, generate_totp_at, validate_totp_at,
};

pub use oauth2::{
    AuthorizationGrant, AuthorizeOutcome, ClientConnection, IssuedCode, OAuth2Error, OAuth2Store,
    OAuthClient,
};

/// Initialize the storage layer and database tables
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    mfa::init().await?;
    oauth2::init().await?;
    Ok(())
}

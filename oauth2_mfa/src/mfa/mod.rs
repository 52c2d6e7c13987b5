//! Multi-factor verification subsystem
//!
//! Holds the per-user MFA status model, the TOTP validator and the status
//! store. The verification engine itself lives in `coordination::mfa`.

mod config;
mod errors;
mod storage;
mod totp;
mod types;

pub use errors::MfaError;
pub use storage::MfaStore;
pub use totp::{generate_totp_at, validate_totp_at};
pub use types::{
    EmailInfo, FieldLocation, FieldLocator, MfaFactor, MfaOutcome, MfaStatus, OutcomeSeverity,
    TotpStatus,
};

pub(crate) use config::MFA_EMAIL_CODE_EXPIRATION;

pub(crate) async fn init() -> Result<(), MfaError> {
    // Initialize the storage layer
    crate::storage::init()
        .await
        .map_err(|e| MfaError::Storage(e.to_string()))?;

    // Initialize the MFA database tables
    MfaStore::init().await?;

    Ok(())
}

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum MfaError {
    #[error("Storage error: {0}")]
    Storage(String),

    /// The stored shared secret cannot be decoded. A configuration fault,
    /// never a normal validation outcome.
    #[error("Invalid TOTP secret: {0}")]
    TotpSecret(String),

    #[error("Invalid MFA factor: {0}")]
    InvalidFactor(String),
}

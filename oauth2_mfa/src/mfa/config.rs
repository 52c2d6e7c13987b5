use std::env;
use std::sync::LazyLock;

/// Seconds an emailed one-time code stays usable after being sent
pub(crate) static MFA_EMAIL_CODE_EXPIRATION: LazyLock<u64> = LazyLock::new(|| {
    env::var("MFA_EMAIL_CODE_EXPIRATION")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3600)
});

/// Accepted clock skew for TOTP validation, in time steps on either side
pub(crate) static TOTP_VERIFY_WINDOW: LazyLock<u8> = LazyLock::new(|| {
    env::var("TOTP_VERIFY_WINDOW")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
});

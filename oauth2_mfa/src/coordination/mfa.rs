//! MFA verification engine
//!
//! Decides whether a presented code satisfies the MFA requirement for a user
//! and factor type, consulting the persisted per-user status row. Every
//! downstream operation that requires MFA runs this first and proceeds only
//! on `Valid`.

use chrono::{DateTime, Duration, Utc};
use subtle::ConstantTimeEq;

use crate::mfa::{
    MFA_EMAIL_CODE_EXPIRATION, MfaError, MfaFactor, MfaOutcome, MfaStore, validate_totp_at,
};

/// Verify a presented code against the user's persisted MFA state
pub async fn verify_mfa_core(user_id: &str, factor: MfaFactor, code: &str) -> MfaOutcome {
    verify_mfa_core_at(user_id, factor, code, Utc::now()).await
}

/// Verify at an explicit instant. Expiration math and the TOTP time step are
/// functions of `now`, which makes outcomes reproducible in tests.
pub async fn verify_mfa_core_at(
    user_id: &str,
    factor: MfaFactor,
    code: &str,
    now: DateTime<Utc>,
) -> MfaOutcome {
    let result = match factor {
        MfaFactor::Totp => verify_totp(user_id, code, now).await,
        MfaFactor::Email => verify_email(user_id, code, now).await,
    };

    match result {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(%user_id, error = %err, "Error while validating MFA");
            MfaOutcome::InternalError
        }
    }
}

/// Pre-condition gate for MFA-protected operations: `Ok(())` only on `Valid`,
/// any other outcome terminates the request with no side effects.
pub async fn require_mfa_core(
    user_id: &str,
    factor: MfaFactor,
    code: &str,
) -> Result<(), MfaOutcome> {
    match verify_mfa_core(user_id, factor, code).await {
        MfaOutcome::Valid => Ok(()),
        outcome => Err(outcome),
    }
}

async fn verify_totp(user_id: &str, code: &str, now: DateTime<Utc>) -> Result<MfaOutcome, MfaError> {
    let Some(status) = MfaStore::get_totp_status(user_id).await? else {
        tracing::error!(%user_id, "Failed to fetch MFA TOTP secret and verification timestamp");
        return Ok(MfaOutcome::LookupFailed);
    };

    let Some(secret) = status.enabled_secret() else {
        tracing::debug!(%user_id, "MFA TOTP is disabled");
        return Ok(MfaOutcome::FactorDisabled);
    };

    if !validate_totp_at(secret, code, now.timestamp() as u64)? {
        tracing::debug!(%user_id, "Invalid code provided for MFA TOTP");
        return Ok(MfaOutcome::InvalidCode);
    }

    Ok(MfaOutcome::Valid)
}

async fn verify_email(
    user_id: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<MfaOutcome, MfaError> {
    let Some(info) = MfaStore::get_email_info(user_id).await? else {
        tracing::error!(%user_id, "Failed to fetch MFA email status, code and timestamp");
        return Ok(MfaOutcome::LookupFailed);
    };

    if info.email.is_none() {
        tracing::debug!(%user_id, "MFA email is disabled");
        return Ok(MfaOutcome::FactorDisabled);
    }

    // A wrong code is reported as invalid even when the stored code would
    // also be expired; the expiry check applies to matching codes only.
    let matches = match info.email_code.as_deref() {
        Some(stored) => bool::from(stored.as_bytes().ct_eq(code.as_bytes())),
        None => false,
    };

    if !matches {
        tracing::debug!(%user_id, "Invalid MFA email code provided");
        return Ok(MfaOutcome::InvalidCode);
    }

    let expiration = Duration::seconds(*MFA_EMAIL_CODE_EXPIRATION as i64);
    match info.email_code_sent_at {
        Some(sent_at) if now - sent_at < expiration => Ok(MfaOutcome::Valid),
        _ => {
            tracing::debug!(%user_id, "MFA email code is expired");
            Ok(MfaOutcome::CodeExpired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mfa::{MfaStatus, generate_totp_at};
    use crate::test_utils::init_test_environment;
    use serial_test::serial;

    const SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";

    fn totp_status(user_id: &str, verified: bool) -> MfaStatus {
        let mut status = MfaStatus::new(user_id.to_string());
        status.totp_secret = Some(SECRET.to_string());
        if verified {
            status.totp_verified_at = Some(Utc::now());
        }
        status
    }

    fn email_status(user_id: &str, code: &str, sent_at: DateTime<Utc>) -> MfaStatus {
        let mut status = MfaStatus::new(user_id.to_string());
        status.email = Some(format!("{user_id}@example.com"));
        status.email_code = Some(code.to_string());
        status.email_code_sent_at = Some(sent_at);
        status
    }

    #[tokio::test]
    #[serial]
    async fn test_totp_missing_row_is_lookup_failed() {
        init_test_environment().await;

        let outcome =
            verify_mfa_core("mfa-user-absent", MfaFactor::Totp, "123456").await;
        assert_eq!(outcome, MfaOutcome::LookupFailed);
    }

    #[tokio::test]
    #[serial]
    async fn test_totp_disabled_without_verification() {
        init_test_environment().await;

        MfaStore::upsert_status(totp_status("mfa-user-unverified", false))
            .await
            .unwrap();

        let outcome =
            verify_mfa_core("mfa-user-unverified", MfaFactor::Totp, "123456").await;
        assert_eq!(outcome, MfaOutcome::FactorDisabled);
    }

    #[tokio::test]
    #[serial]
    async fn test_totp_disabled_without_secret() {
        init_test_environment().await;

        let mut status = MfaStatus::new("mfa-user-secretless".to_string());
        status.totp_verified_at = Some(Utc::now());
        MfaStore::upsert_status(status).await.unwrap();

        let outcome =
            verify_mfa_core("mfa-user-secretless", MfaFactor::Totp, "123456").await;
        assert_eq!(outcome, MfaOutcome::FactorDisabled);
    }

    #[tokio::test]
    #[serial]
    async fn test_totp_current_code_is_valid() {
        init_test_environment().await;

        MfaStore::upsert_status(totp_status("mfa-user-totp", true))
            .await
            .unwrap();

        let now = Utc::now();
        let code = generate_totp_at(SECRET, now.timestamp() as u64).unwrap();

        let outcome =
            verify_mfa_core_at("mfa-user-totp", MfaFactor::Totp, &code, now).await;
        assert_eq!(outcome, MfaOutcome::Valid);
    }

    #[tokio::test]
    #[serial]
    async fn test_totp_stale_code_is_invalid() {
        init_test_environment().await;

        MfaStore::upsert_status(totp_status("mfa-user-stale", true))
            .await
            .unwrap();

        let now = Utc::now();
        // Ten steps in the past, far outside the one-step skew window
        let code = generate_totp_at(SECRET, now.timestamp() as u64 - 300).unwrap();

        let outcome =
            verify_mfa_core_at("mfa-user-stale", MfaFactor::Totp, &code, now).await;
        assert_eq!(outcome, MfaOutcome::InvalidCode);
    }

    #[tokio::test]
    #[serial]
    async fn test_email_code_valid_before_expiration() {
        init_test_environment().await;

        let now = Utc::now();
        MfaStore::upsert_status(email_status(
            "mfa-user-email",
            "FGSLKJ23",
            now - Duration::minutes(59),
        ))
        .await
        .unwrap();

        let outcome =
            verify_mfa_core_at("mfa-user-email", MfaFactor::Email, "FGSLKJ23", now).await;
        assert_eq!(outcome, MfaOutcome::Valid);
    }

    #[tokio::test]
    #[serial]
    async fn test_email_code_expired_past_threshold() {
        init_test_environment().await;

        let now = Utc::now();
        MfaStore::upsert_status(email_status(
            "mfa-user-expired",
            "FGSLKJ23",
            now - Duration::minutes(61),
        ))
        .await
        .unwrap();

        let outcome =
            verify_mfa_core_at("mfa-user-expired", MfaFactor::Email, "FGSLKJ23", now).await;
        assert_eq!(outcome, MfaOutcome::CodeExpired);
    }

    #[tokio::test]
    #[serial]
    async fn test_email_code_expired_exactly_at_threshold() {
        init_test_environment().await;

        let now = Utc::now();
        MfaStore::upsert_status(email_status(
            "mfa-user-boundary",
            "FGSLKJ23",
            now - Duration::seconds(3600),
        ))
        .await
        .unwrap();

        let outcome =
            verify_mfa_core_at("mfa-user-boundary", MfaFactor::Email, "FGSLKJ23", now).await;
        assert_eq!(outcome, MfaOutcome::CodeExpired);
    }

    #[tokio::test]
    #[serial]
    async fn test_email_wrong_code_beats_expiry() {
        init_test_environment().await;

        let now = Utc::now();
        // Long expired, but the mismatch must be what the caller sees
        MfaStore::upsert_status(email_status(
            "mfa-user-wrong",
            "FGSLKJ23",
            now - Duration::days(7),
        ))
        .await
        .unwrap();

        let outcome =
            verify_mfa_core_at("mfa-user-wrong", MfaFactor::Email, "WRONG123", now).await;
        assert_eq!(outcome, MfaOutcome::InvalidCode);
    }

    #[tokio::test]
    #[serial]
    async fn test_email_disabled_without_address() {
        init_test_environment().await;

        let mut status = MfaStatus::new("mfa-user-noemail".to_string());
        status.email_code = Some("FGSLKJ23".to_string());
        status.email_code_sent_at = Some(Utc::now());
        MfaStore::upsert_status(status).await.unwrap();

        let outcome =
            verify_mfa_core("mfa-user-noemail", MfaFactor::Email, "FGSLKJ23").await;
        assert_eq!(outcome, MfaOutcome::FactorDisabled);
    }

    #[tokio::test]
    #[serial]
    async fn test_email_missing_sent_timestamp_is_expired() {
        init_test_environment().await;

        let mut status = MfaStatus::new("mfa-user-notimestamp".to_string());
        status.email = Some("mfa-user-notimestamp@example.com".to_string());
        status.email_code = Some("FGSLKJ23".to_string());
        MfaStore::upsert_status(status).await.unwrap();

        let outcome =
            verify_mfa_core("mfa-user-notimestamp", MfaFactor::Email, "FGSLKJ23").await;
        assert_eq!(outcome, MfaOutcome::CodeExpired);
    }

    #[tokio::test]
    #[serial]
    async fn test_rotated_code_replaces_old_one() {
        init_test_environment().await;

        let now = Utc::now();
        MfaStore::upsert_status(email_status(
            "mfa-user-rotate",
            "OLDCODE1",
            now - Duration::days(1),
        ))
        .await
        .unwrap();

        MfaStore::set_email_code("mfa-user-rotate", "NEWCODE9", now)
            .await
            .unwrap();

        let outcome =
            verify_mfa_core_at("mfa-user-rotate", MfaFactor::Email, "NEWCODE9", now).await;
        assert_eq!(outcome, MfaOutcome::Valid);

        let outcome =
            verify_mfa_core_at("mfa-user-rotate", MfaFactor::Email, "OLDCODE1", now).await;
        assert_eq!(outcome, MfaOutcome::InvalidCode);
    }

    #[tokio::test]
    #[serial]
    async fn test_gate_blocks_everything_but_valid() {
        init_test_environment().await;

        let now = Utc::now();
        MfaStore::upsert_status(email_status("mfa-user-gate", "FGSLKJ23", now))
            .await
            .unwrap();

        assert_eq!(
            require_mfa_core("mfa-user-gate", MfaFactor::Email, "FGSLKJ23").await,
            Ok(())
        );
        assert_eq!(
            require_mfa_core("mfa-user-gate", MfaFactor::Email, "BADCODE0").await,
            Err(MfaOutcome::InvalidCode)
        );
        assert_eq!(
            require_mfa_core("mfa-user-gate", MfaFactor::Totp, "123456").await,
            Err(MfaOutcome::FactorDisabled)
        );
    }
}

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::mfa::errors::MfaError;
use crate::mfa::types::{EmailInfo, MfaStatus, TotpStatus};
use crate::storage::validate_postgres_table_schema;

use super::config::DB_TABLE_MFA_STATUS;

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {mfa_table} (
            user_id TEXT PRIMARY KEY NOT NULL,
            email TEXT,
            totp_secret TEXT,
            totp_verified_at TIMESTAMPTZ,
            email_code TEXT,
            email_code_sent_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| MfaError::Storage(e.to_string()))?;

    Ok(())
}

/// Validates that the MFA status table schema matches what we expect
pub(super) async fn validate_mfa_tables_postgres(pool: &Pool<Postgres>) -> Result<(), MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    let expected_columns = [
        ("user_id", "text"),
        ("email", "text"),
        ("totp_secret", "text"),
        ("totp_verified_at", "timestamp with time zone"),
        ("email_code", "text"),
        ("email_code_sent_at", "timestamp with time zone"),
        ("created_at", "timestamp with time zone"),
        ("updated_at", "timestamp with time zone"),
    ];

    validate_postgres_table_schema(pool, mfa_table, &expected_columns, MfaError::Storage).await
}

pub(super) async fn get_totp_status_postgres(
    pool: &Pool<Postgres>,
    user_id: &str,
) -> Result<Option<TotpStatus>, MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    sqlx::query_as::<_, TotpStatus>(&format!(
        r#"
        SELECT totp_secret, totp_verified_at FROM {mfa_table}
        WHERE user_id = $1
        "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| MfaError::Storage(e.to_string()))
}

pub(super) async fn get_email_info_postgres(
    pool: &Pool<Postgres>,
    user_id: &str,
) -> Result<Option<EmailInfo>, MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    sqlx::query_as::<_, EmailInfo>(&format!(
        r#"
        SELECT email, email_code, email_code_sent_at FROM {mfa_table}
        WHERE user_id = $1
        "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| MfaError::Storage(e.to_string()))
}

pub(super) async fn upsert_status_postgres(
    pool: &Pool<Postgres>,
    status: MfaStatus,
) -> Result<(), MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {mfa_table}
            (user_id, email, totp_secret, totp_verified_at, email_code, email_code_sent_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT(user_id) DO UPDATE SET
            email = EXCLUDED.email,
            totp_secret = EXCLUDED.totp_secret,
            totp_verified_at = EXCLUDED.totp_verified_at,
            email_code = EXCLUDED.email_code,
            email_code_sent_at = EXCLUDED.email_code_sent_at,
            updated_at = EXCLUDED.updated_at
        "#
    ))
    .bind(&status.user_id)
    .bind(&status.email)
    .bind(&status.totp_secret)
    .bind(status.totp_verified_at)
    .bind(&status.email_code)
    .bind(status.email_code_sent_at)
    .bind(status.created_at)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| MfaError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn set_email_code_postgres(
    pool: &Pool<Postgres>,
    user_id: &str,
    code: &str,
    sent_at: DateTime<Utc>,
) -> Result<(), MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {mfa_table} SET
            email_code = $1,
            email_code_sent_at = $2,
            updated_at = $3
        WHERE user_id = $4
        "#
    ))
    .bind(code)
    .bind(sent_at)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| MfaError::Storage(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(MfaError::Storage(format!(
            "No MFA status row for user {user_id}"
        )));
    }

    Ok(())
}

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::mfa::errors::MfaError;
use crate::mfa::types::{EmailInfo, MfaStatus, TotpStatus};
use crate::storage::validate_sqlite_table_schema;

use super::config::DB_TABLE_MFA_STATUS;

// SQLite implementations
pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {mfa_table} (
            user_id TEXT PRIMARY KEY NOT NULL,
            email TEXT,
            totp_secret TEXT,
            totp_verified_at TIMESTAMP,
            email_code TEXT,
            email_code_sent_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| MfaError::Storage(e.to_string()))?;

    Ok(())
}

/// Validates that the MFA status table schema matches what we expect
pub(super) async fn validate_mfa_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    let expected_columns = [
        ("user_id", "TEXT"),
        ("email", "TEXT"),
        ("totp_secret", "TEXT"),
        ("totp_verified_at", "TIMESTAMP"),
        ("email_code", "TEXT"),
        ("email_code_sent_at", "TIMESTAMP"),
        ("created_at", "TIMESTAMP"),
        ("updated_at", "TIMESTAMP"),
    ];

    validate_sqlite_table_schema(pool, mfa_table, &expected_columns, MfaError::Storage).await
}

pub(super) async fn get_totp_status_sqlite(
    pool: &Pool<Sqlite>,
    user_id: &str,
) -> Result<Option<TotpStatus>, MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    // Ensure tables exist before any operations
    create_tables_sqlite(pool).await?;

    sqlx::query_as::<_, TotpStatus>(&format!(
        r#"
        SELECT totp_secret, totp_verified_at FROM {mfa_table}
        WHERE user_id = ?
        "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| MfaError::Storage(e.to_string()))
}

pub(super) async fn get_email_info_sqlite(
    pool: &Pool<Sqlite>,
    user_id: &str,
) -> Result<Option<EmailInfo>, MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    // Ensure tables exist before any operations
    create_tables_sqlite(pool).await?;

    sqlx::query_as::<_, EmailInfo>(&format!(
        r#"
        SELECT email, email_code, email_code_sent_at FROM {mfa_table}
        WHERE user_id = ?
        "#
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| MfaError::Storage(e.to_string()))
}

pub(super) async fn upsert_status_sqlite(
    pool: &Pool<Sqlite>,
    status: MfaStatus,
) -> Result<(), MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    create_tables_sqlite(pool).await?;

    sqlx::query(&format!(
        r#"
        INSERT INTO {mfa_table}
            (user_id, email, totp_secret, totp_verified_at, email_code, email_code_sent_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            email = excluded.email,
            totp_secret = excluded.totp_secret,
            totp_verified_at = excluded.totp_verified_at,
            email_code = excluded.email_code,
            email_code_sent_at = excluded.email_code_sent_at,
            updated_at = excluded.updated_at
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

pub(super) async fn set_email_code_sqlite(
    pool: &Pool<Sqlite>,
    user_id: &str,
    code: &str,
    sent_at: DateTime<Utc>,
) -> Result<(), MfaError> {
    let mfa_table = DB_TABLE_MFA_STATUS.as_str();

    create_tables_sqlite(pool).await?;

    let result = sqlx::query(&format!(
        r#"
        UPDATE {mfa_table} SET
            email_code = ?,
            email_code_sent_at = ?,
            updated_at = ?
        WHERE user_id = ?
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

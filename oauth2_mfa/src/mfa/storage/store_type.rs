use chrono::{DateTime, Utc};

use crate::mfa::errors::MfaError;
use crate::mfa::types::{EmailInfo, MfaStatus, TotpStatus};
use crate::storage::GENERIC_DATA_STORE;

use super::postgres::*;
use super::sqlite::*;

pub struct MfaStore;

impl MfaStore {
    /// Initialize the MFA database tables
    pub(crate) async fn init() -> Result<(), MfaError> {
        let store = GENERIC_DATA_STORE.lock().await;

        match (store.as_sqlite(), store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool).await?;
                validate_mfa_tables_sqlite(pool).await?;
                Ok(())
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool).await?;
                validate_mfa_tables_postgres(pool).await?;
                Ok(())
            }
            _ => Err(MfaError::Storage("Unsupported database type".to_string())),
        }
    }

    /// Fetch the TOTP columns of a user's status row
    pub async fn get_totp_status(user_id: &str) -> Result<Option<TotpStatus>, MfaError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            get_totp_status_sqlite(pool, user_id).await
        } else if let Some(pool) = store.as_postgres() {
            get_totp_status_postgres(pool, user_id).await
        } else {
            Err(MfaError::Storage("Unsupported database type".to_string()))
        }
    }

    /// Fetch the email columns of a user's status row
    pub async fn get_email_info(user_id: &str) -> Result<Option<EmailInfo>, MfaError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            get_email_info_sqlite(pool, user_id).await
        } else if let Some(pool) = store.as_postgres() {
            get_email_info_postgres(pool, user_id).await
        } else {
            Err(MfaError::Storage("Unsupported database type".to_string()))
        }
    }

    /// Create or replace a user's status row
    pub async fn upsert_status(status: MfaStatus) -> Result<(), MfaError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            upsert_status_sqlite(pool, status).await
        } else if let Some(pool) = store.as_postgres() {
            upsert_status_postgres(pool, status).await
        } else {
            Err(MfaError::Storage("Unsupported database type".to_string()))
        }
    }

    /// Rotate the emailed code and its sent timestamp as one pair.
    /// The row must already exist; rotation never creates status.
    pub async fn set_email_code(
        user_id: &str,
        code: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), MfaError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            set_email_code_sqlite(pool, user_id, code, sent_at).await
        } else if let Some(pool) = store.as_postgres() {
            set_email_code_postgres(pool, user_id, code, sent_at).await
        } else {
            Err(MfaError::Storage("Unsupported database type".to_string()))
        }
    }
}

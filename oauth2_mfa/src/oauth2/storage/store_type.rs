use chrono::{DateTime, Utc};

use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::{AuthorizationGrant, AuthorizeDecision, ClientConnection, OAuthClient};
use crate::storage::GENERIC_DATA_STORE;

use super::postgres::*;
use super::sqlite::*;

pub struct OAuth2Store;

impl OAuth2Store {
    /// Initialize the OAuth2 database tables
    pub(crate) async fn init() -> Result<(), OAuth2Error> {
        let store = GENERIC_DATA_STORE.lock().await;

        match (store.as_sqlite(), store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool).await?;
                validate_oauth2_tables_sqlite(pool).await?;
                Ok(())
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool).await?;
                validate_oauth2_tables_postgres(pool).await?;
                Ok(())
            }
            _ => Err(OAuth2Error::Storage(
                "Unsupported database type".to_string(),
            )),
        }
    }

    /// Register or update a client
    pub async fn upsert_client(client: OAuthClient) -> Result<(), OAuth2Error> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            upsert_client_sqlite(pool, client).await
        } else if let Some(pool) = store.as_postgres() {
            upsert_client_postgres(pool, client).await
        } else {
            Err(OAuth2Error::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    /// Fetch a registered client by id
    pub async fn get_client(client_id: &str) -> Result<Option<OAuthClient>, OAuth2Error> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            get_client_sqlite(pool, client_id).await
        } else if let Some(pool) = store.as_postgres() {
            get_client_postgres(pool, client_id).await
        } else {
            Err(OAuth2Error::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    /// Fetch the consent record for `(client, user)`
    pub async fn get_connection(
        client_id: &str,
        user_id: &str,
    ) -> Result<Option<ClientConnection>, OAuth2Error> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            get_connection_sqlite(pool, client_id, user_id).await
        } else if let Some(pool) = store.as_postgres() {
            get_connection_postgres(pool, client_id, user_id).await
        } else {
            Err(OAuth2Error::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    /// Fetch every grant issued to `(client, user)`, oldest first
    pub async fn get_grants(
        client_id: &str,
        user_id: &str,
    ) -> Result<Vec<AuthorizationGrant>, OAuth2Error> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            get_grants_sqlite(pool, client_id, user_id).await
        } else if let Some(pool) = store.as_postgres() {
            get_grants_postgres(pool, client_id, user_id).await
        } else {
            Err(OAuth2Error::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    /// Run the authorize decision as one transaction: look up the client,
    /// reconcile against any stored consent, and conditionally write the
    /// grant (and first-time consent) before committing. Two concurrent
    /// calls for the same `(client, user)` can never both insert.
    pub(crate) async fn authorize(
        user_id: &str,
        client_id: &str,
        redirect_url: &str,
        scopes: &[String],
        now: DateTime<Utc>,
    ) -> Result<AuthorizeDecision, OAuth2Error> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            authorize_sqlite(pool, user_id, client_id, redirect_url, scopes, now).await
        } else if let Some(pool) = store.as_postgres() {
            authorize_postgres(pool, user_id, client_id, redirect_url, scopes, now).await
        } else {
            Err(OAuth2Error::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }
}

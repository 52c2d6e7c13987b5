use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::{AuthorizationGrant, AuthorizeDecision, ClientConnection, OAuthClient};
use crate::storage::validate_postgres_table_schema;

use super::config::{
    DB_TABLE_OAUTH2_AUTH_CODES, DB_TABLE_OAUTH2_CLIENTS, DB_TABLE_OAUTH2_CONNECTIONS,
};

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), OAuth2Error> {
    let clients_table = DB_TABLE_OAUTH2_CLIENTS.as_str();
    let connections_table = DB_TABLE_OAUTH2_CONNECTIONS.as_str();
    let codes_table = DB_TABLE_OAUTH2_AUTH_CODES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {clients_table} (
            id TEXT PRIMARY KEY NOT NULL,
            redirect_url TEXT NOT NULL,
            allowed_scopes JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {connections_table} (
            client_id TEXT NOT NULL REFERENCES {clients_table}(id),
            user_id TEXT NOT NULL,
            redirect_url TEXT NOT NULL,
            scopes JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            UNIQUE(client_id, user_id)
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {codes_table} (
            code TEXT PRIMARY KEY NOT NULL,
            client_id TEXT NOT NULL REFERENCES {clients_table}(id),
            user_id TEXT NOT NULL,
            scopes JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    // Index for grant lookups by subject pair
    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{}_client_user ON {}(client_id, user_id)
        "#,
        codes_table.replace(".", "_"),
        codes_table
    ))
    .execute(pool)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    Ok(())
}

/// Validates that the OAuth2 table schemas match what we expect
pub(super) async fn validate_oauth2_tables_postgres(
    pool: &Pool<Postgres>,
) -> Result<(), OAuth2Error> {
    let expected_clients = [
        ("id", "text"),
        ("redirect_url", "text"),
        ("allowed_scopes", "jsonb"),
        ("created_at", "timestamp with time zone"),
        ("updated_at", "timestamp with time zone"),
    ];
    validate_postgres_table_schema(
        pool,
        DB_TABLE_OAUTH2_CLIENTS.as_str(),
        &expected_clients,
        OAuth2Error::Storage,
    )
    .await?;

    let expected_connections = [
        ("client_id", "text"),
        ("user_id", "text"),
        ("redirect_url", "text"),
        ("scopes", "jsonb"),
        ("created_at", "timestamp with time zone"),
    ];
    validate_postgres_table_schema(
        pool,
        DB_TABLE_OAUTH2_CONNECTIONS.as_str(),
        &expected_connections,
        OAuth2Error::Storage,
    )
    .await?;

    let expected_codes = [
        ("code", "text"),
        ("client_id", "text"),
        ("user_id", "text"),
        ("scopes", "jsonb"),
        ("created_at", "timestamp with time zone"),
        ("expires_at", "timestamp with time zone"),
    ];
    validate_postgres_table_schema(
        pool,
        DB_TABLE_OAUTH2_AUTH_CODES.as_str(),
        &expected_codes,
        OAuth2Error::Storage,
    )
    .await
}

pub(super) async fn upsert_client_postgres(
    pool: &Pool<Postgres>,
    client: OAuthClient,
) -> Result<(), OAuth2Error> {
    let clients_table = DB_TABLE_OAUTH2_CLIENTS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {clients_table} (id, redirect_url, allowed_scopes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT(id) DO UPDATE SET
            redirect_url = EXCLUDED.redirect_url,
            allowed_scopes = EXCLUDED.allowed_scopes,
            updated_at = EXCLUDED.updated_at
        "#
    ))
    .bind(&client.id)
    .bind(&client.redirect_url)
    .bind(&client.allowed_scopes)
    .bind(client.created_at)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_client_postgres(
    pool: &Pool<Postgres>,
    client_id: &str,
) -> Result<Option<OAuthClient>, OAuth2Error> {
    let clients_table = DB_TABLE_OAUTH2_CLIENTS.as_str();

    sqlx::query_as::<_, OAuthClient>(&format!(
        r#"
        SELECT * FROM {clients_table}
        WHERE id = $1
        "#
    ))
    .bind(client_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))
}

pub(super) async fn get_connection_postgres(
    pool: &Pool<Postgres>,
    client_id: &str,
    user_id: &str,
) -> Result<Option<ClientConnection>, OAuth2Error> {
    let connections_table = DB_TABLE_OAUTH2_CONNECTIONS.as_str();

    sqlx::query_as::<_, ClientConnection>(&format!(
        r#"
        SELECT * FROM {connections_table}
        WHERE client_id = $1 AND user_id = $2
        "#
    ))
    .bind(client_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))
}

pub(super) async fn get_grants_postgres(
    pool: &Pool<Postgres>,
    client_id: &str,
    user_id: &str,
) -> Result<Vec<AuthorizationGrant>, OAuth2Error> {
    let codes_table = DB_TABLE_OAUTH2_AUTH_CODES.as_str();

    sqlx::query_as::<_, AuthorizationGrant>(&format!(
        r#"
        SELECT * FROM {codes_table}
        WHERE client_id = $1 AND user_id = $2
        ORDER BY created_at
        "#
    ))
    .bind(client_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))
}

pub(super) async fn authorize_postgres(
    pool: &Pool<Postgres>,
    user_id: &str,
    client_id: &str,
    redirect_url: &str,
    scopes: &[String],
    now: DateTime<Utc>,
) -> Result<AuthorizeDecision, OAuth2Error> {
    let clients_table = DB_TABLE_OAUTH2_CLIENTS.as_str();
    let connections_table = DB_TABLE_OAUTH2_CONNECTIONS.as_str();
    let codes_table = DB_TABLE_OAUTH2_AUTH_CODES.as_str();

    // Returning before commit rolls the transaction back; the read-decide-
    // write sequence is never split across independently committed steps.
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    let client = sqlx::query_as::<_, OAuthClient>(&format!(
        r#"
        SELECT * FROM {clients_table}
        WHERE id = $1
        "#
    ))
    .bind(client_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    let Some(client) = client else {
        return Ok(AuthorizeDecision::ClientNotFound);
    };

    if !client.accepts(redirect_url, scopes) {
        return Ok(AuthorizeDecision::ClientNotFound);
    }

    let connection = sqlx::query_as::<_, ClientConnection>(&format!(
        r#"
        SELECT * FROM {connections_table}
        WHERE client_id = $1 AND user_id = $2
        "#
    ))
    .bind(client_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    if let Some(connection) = &connection {
        if connection.satisfies(redirect_url, scopes) {
            return Ok(AuthorizeDecision::AlreadyAuthorized);
        }
    }

    let grant = AuthorizationGrant::issue(
        client_id.to_string(),
        user_id.to_string(),
        scopes.to_vec(),
        now,
    );

    sqlx::query(&format!(
        r#"
        INSERT INTO {codes_table} (code, client_id, user_id, scopes, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#
    ))
    .bind(&grant.code)
    .bind(&grant.client_id)
    .bind(&grant.user_id)
    .bind(&grant.scopes)
    .bind(grant.created_at)
    .bind(grant.expires_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    // Consent is recorded on the first-ever authorization only
    if connection.is_none() {
        sqlx::query(&format!(
            r#"
            INSERT INTO {connections_table} (client_id, user_id, redirect_url, scopes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#
        ))
        .bind(client_id)
        .bind(user_id)
        .bind(redirect_url)
        .bind(&grant.scopes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| OAuth2Error::Storage(e.to_string()))?;
    }

    tx.commit()
        .await
        .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    Ok(AuthorizeDecision::Issued(grant))
}

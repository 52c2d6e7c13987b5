use std::env;
use std::sync::LazyLock;

use crate::storage::DB_TABLE_PREFIX;

/// Registered clients table name
pub(crate) static DB_TABLE_OAUTH2_CLIENTS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_OAUTH2_CLIENTS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "oauth2_clients"))
});

/// Client connections (consent) table name
pub(crate) static DB_TABLE_OAUTH2_CONNECTIONS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_OAUTH2_CONNECTIONS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "oauth2_connections"))
});

/// Authorization codes table name
pub(crate) static DB_TABLE_OAUTH2_AUTH_CODES: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_OAUTH2_AUTH_CODES")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "oauth2_auth_codes"))
});

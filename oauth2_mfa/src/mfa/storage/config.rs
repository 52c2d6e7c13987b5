use std::env;
use std::sync::LazyLock;

use crate::storage::DB_TABLE_PREFIX;

/// MFA status table name
pub(crate) static DB_TABLE_MFA_STATUS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_MFA_STATUS")
        .unwrap_or_else(|_| format!("{}{}", *DB_TABLE_PREFIX, "mfa_status"))
});

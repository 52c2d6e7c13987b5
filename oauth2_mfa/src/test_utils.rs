//! Test utilities module for shared test initialization
//!
//! Loads the test environment from `.env_test` (with fallback to `.env`)
//! exactly once and initializes the database stores. The test database is a
//! shared-cache in-memory SQLite instance, so every pooled connection sees
//! the same tables.

use std::sync::Once;

use crate::mfa::MfaStore;
use crate::oauth2::OAuth2Store;

pub(crate) async fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }
    });

    // Initialize stores - log errors but don't panic in tests
    if let Err(e) = MfaStore::init().await {
        eprintln!("Warning: Failed to initialize MfaStore: {e}");
    }
    if let Err(e) = OAuth2Store::init().await {
        eprintln!("Warning: Failed to initialize OAuth2Store: {e}");
    }
}

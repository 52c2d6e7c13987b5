//! OAuth2 authorization-code subsystem
//!
//! Holds the client/consent/grant model and the transactional store behind
//! the authorization flow in `coordination::oauth2`.

mod config;
mod errors;
mod storage;
mod types;

pub use errors::OAuth2Error;
pub use storage::OAuth2Store;
pub use types::{AuthorizationGrant, AuthorizeOutcome, ClientConnection, IssuedCode, OAuthClient};

pub(crate) use types::AuthorizeDecision;

pub(crate) async fn init() -> Result<(), OAuth2Error> {
    // Initialize the storage layer
    crate::storage::init()
        .await
        .map_err(|e| OAuth2Error::Storage(e.to_string()))?;

    // Initialize the OAuth2 database tables
    OAuth2Store::init().await?;

    Ok(())
}

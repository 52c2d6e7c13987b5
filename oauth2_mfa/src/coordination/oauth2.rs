//! OAuth2 authorization-code flow
//!
//! Authorizes a client application to act for a user with a requested scope
//! set: either confirms an equivalent consent already exists (idempotent
//! short-circuit) or mints a new time-boxed code. The read-decide-write
//! sequence runs as one transaction inside `OAuth2Store::authorize`.

use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

use crate::oauth2::{AuthorizeDecision, AuthorizeOutcome, IssuedCode, OAuth2Store};

/// Authorize `client_id` to act for `user_id` with the requested scopes
pub async fn authorize_core(
    user_id: &str,
    client_id: Uuid,
    redirect_url: &Url,
    scopes: &[String],
) -> AuthorizeOutcome {
    authorize_core_at(user_id, client_id, redirect_url, scopes, Utc::now()).await
}

/// Authorize at an explicit instant; the grant's validity window is computed
/// from `now` once, at issuance.
pub async fn authorize_core_at(
    user_id: &str,
    client_id: Uuid,
    redirect_url: &Url,
    scopes: &[String],
    now: DateTime<Utc>,
) -> AuthorizeOutcome {
    let client_id = client_id.to_string();

    match OAuth2Store::authorize(user_id, &client_id, redirect_url.as_str(), scopes, now).await {
        Ok(AuthorizeDecision::ClientNotFound) => {
            tracing::debug!(%client_id, "Client not found");
            AuthorizeOutcome::ClientNotFound
        }
        Ok(AuthorizeDecision::AlreadyAuthorized) => {
            tracing::debug!(%user_id, %client_id, "Client connection already authorized");
            AuthorizeOutcome::AlreadyAuthorized
        }
        Ok(AuthorizeDecision::Issued(grant)) => {
            tracing::debug!(%user_id, %client_id, "Authorization code created");
            AuthorizeOutcome::Authorized(IssuedCode::from(grant))
        }
        Err(err) => {
            tracing::error!(%user_id, %client_id, error = %err, "Error while authorizing client");
            AuthorizeOutcome::InternalError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth2::OAuthClient;
    use crate::test_utils::init_test_environment;
    use chrono::Duration;
    use serial_test::serial;

    fn example_url() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    fn scopes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    async fn register_client(allowed: &[&str]) -> Uuid {
        let client_id = Uuid::new_v4();
        OAuth2Store::upsert_client(OAuthClient::new(client_id, example_url(), scopes(allowed)))
            .await
            .unwrap();
        client_id
    }

    #[tokio::test]
    #[serial]
    async fn test_unknown_client_is_not_found() {
        init_test_environment().await;

        let outcome = authorize_core(
            "oauth-user-1",
            Uuid::new_v4(),
            &example_url(),
            &scopes(&["inventory.read"]),
        )
        .await;

        assert_eq!(outcome, AuthorizeOutcome::ClientNotFound);
    }

    #[tokio::test]
    #[serial]
    async fn test_authorize_then_short_circuit() {
        init_test_environment().await;

        let client_id = register_client(&["inventory.read"]).await;
        let requested = scopes(&["inventory.read"]);
        let now = Utc::now();

        let outcome =
            authorize_core_at("oauth-user-2", client_id, &example_url(), &requested, now).await;

        let issued = match outcome {
            AuthorizeOutcome::Authorized(issued) => issued,
            other => panic!("expected Authorized, got {other:?}"),
        };
        assert!(Uuid::parse_str(&issued.code).is_ok());
        assert_eq!(issued.expires_at - now, Duration::seconds(300));

        // The identical request again is a no-op success with no second grant
        let outcome =
            authorize_core_at("oauth-user-2", client_id, &example_url(), &requested, now).await;
        assert_eq!(outcome, AuthorizeOutcome::AlreadyAuthorized);

        let grants = OAuth2Store::get_grants(&client_id.to_string(), "oauth-user-2")
            .await
            .unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].code, issued.code);
        assert_eq!(
            grants[0].expires_at - grants[0].created_at,
            Duration::seconds(300)
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_first_authorization_records_consent() {
        init_test_environment().await;

        let client_id = register_client(&["inventory.read", "inventory.write"]).await;
        let requested = scopes(&["inventory.read"]);

        assert!(
            OAuth2Store::get_connection(&client_id.to_string(), "oauth-user-3")
                .await
                .unwrap()
                .is_none()
        );

        authorize_core("oauth-user-3", client_id, &example_url(), &requested).await;

        let connection = OAuth2Store::get_connection(&client_id.to_string(), "oauth-user-3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connection.redirect_url, example_url().to_string());
        assert_eq!(connection.scopes.0, requested);
    }

    #[tokio::test]
    #[serial]
    async fn test_redirect_mismatch_is_not_found() {
        init_test_environment().await;

        let client_id = register_client(&["inventory.read"]).await;

        let outcome = authorize_core(
            "oauth-user-4",
            client_id,
            &Url::parse("https://evil.example.net").unwrap(),
            &scopes(&["inventory.read"]),
        )
        .await;

        assert_eq!(outcome, AuthorizeOutcome::ClientNotFound);
    }

    #[tokio::test]
    #[serial]
    async fn test_unregistered_scope_is_not_found() {
        init_test_environment().await;

        let client_id = register_client(&["inventory.read"]).await;

        let outcome = authorize_core(
            "oauth-user-5",
            client_id,
            &example_url(),
            &scopes(&["inventory.read", "admin.write"]),
        )
        .await;

        assert_eq!(outcome, AuthorizeOutcome::ClientNotFound);
    }

    #[tokio::test]
    #[serial]
    async fn test_scope_escalation_mints_new_grant() {
        init_test_environment().await;

        let client_id = register_client(&["inventory.read", "inventory.write"]).await;

        let outcome = authorize_core(
            "oauth-user-6",
            client_id,
            &example_url(),
            &scopes(&["inventory.read"]),
        )
        .await;
        assert!(matches!(outcome, AuthorizeOutcome::Authorized(_)));

        // The stored consent covers only inventory.read, so asking for more
        // must mint again rather than short-circuit
        let outcome = authorize_core(
            "oauth-user-6",
            client_id,
            &example_url(),
            &scopes(&["inventory.read", "inventory.write"]),
        )
        .await;
        assert!(matches!(outcome, AuthorizeOutcome::Authorized(_)));

        let grants = OAuth2Store::get_grants(&client_id.to_string(), "oauth-user-6")
            .await
            .unwrap();
        assert_eq!(grants.len(), 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_narrower_request_short_circuits() {
        init_test_environment().await;

        let client_id = register_client(&["inventory.read", "inventory.write"]).await;

        authorize_core(
            "oauth-user-7",
            client_id,
            &example_url(),
            &scopes(&["inventory.read", "inventory.write"]),
        )
        .await;

        // The stored consent is a superset of this request
        let outcome = authorize_core(
            "oauth-user-7",
            client_id,
            &example_url(),
            &scopes(&["inventory.read"]),
        )
        .await;
        assert_eq!(outcome, AuthorizeOutcome::AlreadyAuthorized);
    }

    #[tokio::test]
    #[serial]
    async fn test_codes_are_unique_across_users() {
        init_test_environment().await;

        let client_id = register_client(&["inventory.read"]).await;
        let requested = scopes(&["inventory.read"]);

        let a = authorize_core("oauth-user-8a", client_id, &example_url(), &requested).await;
        let b = authorize_core("oauth-user-8b", client_id, &example_url(), &requested).await;

        match (a, b) {
            (AuthorizeOutcome::Authorized(a), AuthorizeOutcome::Authorized(b)) => {
                assert_ne!(a.code, b.code);
            }
            other => panic!("expected two Authorized outcomes, got {other:?}"),
        }
    }
}

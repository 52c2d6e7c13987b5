use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use url::Url;
use uuid::Uuid;

use super::config::OAUTH2_AUTH_CODE_TTL;

/// A registered third-party client application
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OAuthClient {
    pub id: String,
    pub redirect_url: String,
    pub allowed_scopes: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthClient {
    /// Register a client. The redirect target is stored in normalized form.
    pub fn new(id: Uuid, redirect_url: Url, allowed_scopes: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            redirect_url: redirect_url.to_string(),
            allowed_scopes: Json(allowed_scopes),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the registration covers the requested redirect target and
    /// every requested scope. A request outside the registration is treated
    /// the same as an unknown client.
    pub fn accepts(&self, redirect_url: &str, scopes: &[String]) -> bool {
        self.redirect_url == redirect_url
            && scopes.iter().all(|s| self.allowed_scopes.contains(s))
    }
}

/// Persisted evidence that a client has previously been authorized by a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientConnection {
    pub client_id: String,
    pub user_id: String,
    pub redirect_url: String,
    pub scopes: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl ClientConnection {
    /// A stored consent satisfies a request when the redirect matches and the
    /// granted scopes cover every requested scope; re-authorization is then
    /// unnecessary.
    pub fn satisfies(&self, redirect_url: &str, scopes: &[String]) -> bool {
        self.redirect_url == redirect_url && scopes.iter().all(|s| self.scopes.contains(s))
    }
}

/// A short-lived, single-use authorization code
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuthorizationGrant {
    pub code: String,
    pub client_id: String,
    pub user_id: String,
    pub scopes: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationGrant {
    /// Mint a grant for `(client, user)`. `expires_at` is computed here, once,
    /// and never recomputed.
    pub fn issue(
        client_id: String,
        user_id: String,
        scopes: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            code: Uuid::new_v4().to_string(),
            client_id,
            user_id,
            scopes: Json(scopes),
            created_at: now,
            expires_at: now + Duration::seconds(*OAUTH2_AUTH_CODE_TTL as i64),
        }
    }
}

/// Payload handed to the boundary for delivery to the client's redirect target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl From<AuthorizationGrant> for IssuedCode {
    fn from(grant: AuthorizationGrant) -> Self {
        Self {
            code: grant.code,
            expires_at: grant.expires_at,
        }
    }
}

/// What the transactional authorize step decided, before coordination maps it
/// for the boundary
#[derive(Debug)]
pub(crate) enum AuthorizeDecision {
    ClientNotFound,
    AlreadyAuthorized,
    Issued(AuthorizationGrant),
}

/// Result of one authorization request
///
/// Maps at the boundary to: not-found, no-content success, created success
/// with `{code, expires}`, or server error.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizeOutcome {
    /// No registered client matches the request
    ClientNotFound,
    /// An equivalent consent already exists; no new code was minted
    AlreadyAuthorized,
    /// A new code was minted for delivery to the redirect target
    Authorized(IssuedCode),
    /// A storage fault aborted the transaction
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_client() -> OAuthClient {
        OAuthClient::new(
            Uuid::new_v4(),
            Url::parse("https://example.com").unwrap(),
            vec!["inventory.read".to_string(), "inventory.write".to_string()],
        )
    }

    #[test]
    fn test_client_accepts_registered_request() {
        let client = test_client();

        assert!(client.accepts(
            "https://example.com/",
            &["inventory.read".to_string()]
        ));
        assert!(client.accepts(
            "https://example.com/",
            &["inventory.read".to_string(), "inventory.write".to_string()]
        ));
    }

    #[test]
    fn test_client_rejects_foreign_redirect() {
        let client = test_client();

        assert!(!client.accepts(
            "https://evil.example.net/",
            &["inventory.read".to_string()]
        ));
    }

    #[test]
    fn test_client_rejects_unregistered_scope() {
        let client = test_client();

        assert!(!client.accepts(
            "https://example.com/",
            &["inventory.read".to_string(), "admin.write".to_string()]
        ));
    }

    #[test]
    fn test_grant_ttl_is_fixed_at_issuance() {
        let now = Utc::now();
        let grant = AuthorizationGrant::issue(
            "client".to_string(),
            "user".to_string(),
            vec!["inventory.read".to_string()],
            now,
        );

        assert_eq!(grant.created_at, now);
        assert_eq!(grant.expires_at - grant.created_at, Duration::seconds(300));
    }

    #[test]
    fn test_grant_codes_are_unique_uuids() {
        let now = Utc::now();
        let a = AuthorizationGrant::issue(
            "client".to_string(),
            "user".to_string(),
            vec![],
            now,
        );
        let b = AuthorizationGrant::issue(
            "client".to_string(),
            "user".to_string(),
            vec![],
            now,
        );

        assert!(Uuid::parse_str(&a.code).is_ok());
        assert!(Uuid::parse_str(&b.code).is_ok());
        assert_ne!(a.code, b.code);
    }

    #[test]
    fn test_issued_code_carries_grant_expiry() {
        let now = Utc::now();
        let grant = AuthorizationGrant::issue(
            "client".to_string(),
            "user".to_string(),
            vec![],
            now,
        );
        let expires_at = grant.expires_at;
        let code = grant.code.clone();

        let issued = IssuedCode::from(grant);
        assert_eq!(issued.code, code);
        assert_eq!(issued.expires_at, expires_at);
    }

    proptest! {
        /// Any subset of the granted scopes is satisfied; any scope outside
        /// the granted set forces re-authorization.
        #[test]
        fn test_connection_satisfies_subsets_only(
            granted in proptest::collection::vec("[a-z]{1,8}\\.[a-z]{1,4}", 1..6),
            extra in "[a-z]{1,8}\\.escalated",
        ) {
            let conn = ClientConnection {
                client_id: "client".to_string(),
                user_id: "user".to_string(),
                redirect_url: "https://example.com/".to_string(),
                scopes: Json(granted.clone()),
                created_at: Utc::now(),
            };

            for i in 0..granted.len() {
                prop_assert!(conn.satisfies("https://example.com/", &granted[..=i]));
            }

            let mut escalated = granted.clone();
            escalated.push(extra);
            prop_assert!(!conn.satisfies("https://example.com/", &escalated));
        }

        /// The redirect target must match exactly regardless of scopes.
        #[test]
        fn test_connection_requires_matching_redirect(
            granted in proptest::collection::vec("[a-z]{1,8}\\.[a-z]{1,4}", 1..4),
        ) {
            let conn = ClientConnection {
                client_id: "client".to_string(),
                user_id: "user".to_string(),
                redirect_url: "https://example.com/".to_string(),
                scopes: Json(granted.clone()),
                created_at: Utc::now(),
            };

            prop_assert!(!conn.satisfies("https://other.example.com/", &granted));
        }
    }
}

use std::env;
use std::sync::LazyLock;

/// Lifetime of an issued authorization code, in seconds. Fixed at issuance
/// and never recomputed.
pub(crate) static OAUTH2_AUTH_CODE_TTL: LazyLock<u64> = LazyLock::new(|| {
    env::var("OAUTH2_AUTH_CODE_TTL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300)
});

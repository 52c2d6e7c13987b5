use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::errors::MfaError;

/// Secondary verification channel required on top of the primary credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaFactor {
    Totp,
    Email,
}

impl MfaFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Totp => "totp",
            Self::Email => "email",
        }
    }
}

impl std::str::FromStr for MfaFactor {
    type Err = MfaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "totp" => Ok(Self::Totp),
            "email" => Ok(Self::Email),
            _ => Err(MfaError::InvalidFactor(s.to_string())),
        }
    }
}

/// Per-user MFA state, one row per user
///
/// A factor is enabled by the presence of its fields: TOTP needs both the
/// secret and the verification timestamp, email needs a registered address.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MfaStatus {
    pub user_id: String,
    pub email: Option<String>,
    pub totp_secret: Option<String>,
    pub totp_verified_at: Option<DateTime<Utc>>,
    pub email_code: Option<String>,
    pub email_code_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MfaStatus {
    /// Create a status row with every factor disabled
    pub fn new(user_id: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email: None,
            totp_secret: None,
            totp_verified_at: None,
            email_code: None,
            email_code_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// TOTP columns of the status row, as read by the verification engine
#[derive(Debug, Clone, FromRow)]
pub struct TotpStatus {
    pub totp_secret: Option<String>,
    pub totp_verified_at: Option<DateTime<Utc>>,
}

impl TotpStatus {
    /// The shared secret, present only when the factor is fully enabled
    pub fn enabled_secret(&self) -> Option<&str> {
        match (&self.totp_secret, &self.totp_verified_at) {
            (Some(secret), Some(_)) => Some(secret),
            _ => None,
        }
    }
}

/// Email columns of the status row, as read by the verification engine
#[derive(Debug, Clone, FromRow)]
pub struct EmailInfo {
    pub email: Option<String>,
    pub email_code: Option<String>,
    pub email_code_sent_at: Option<DateTime<Utc>>,
}

/// Where in the request the offending input lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLocation {
    Body,
}

/// Locator for field-level validation responses, e.g. `{location: body, path: code}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLocator {
    pub location: FieldLocation,
    pub path: String,
}

impl FieldLocator {
    pub fn body(path: &str) -> Self {
        Self {
            location: FieldLocation::Body,
            path: path.to_string(),
        }
    }
}

/// Error class an outcome maps to at the transport boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeSeverity {
    ClientError,
    ServerError,
}

/// Result of one MFA verification attempt
///
/// Domain rejections are variants, not errors, so the boundary layer can
/// handle every case exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaOutcome {
    /// The presented code satisfies the factor
    Valid,
    /// The requested factor is not enabled for this user
    FactorDisabled,
    /// The presented code does not match
    InvalidCode,
    /// The code matched but its validity window has passed
    CodeExpired,
    /// No status row exists where the domain guarantees one
    LookupFailed,
    /// A storage or validator fault was absorbed at the engine boundary
    InternalError,
}

impl MfaOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Which input field a rejection concerns, for field-level reporting.
    /// Internal failures carry no locator.
    pub fn locator(&self) -> Option<FieldLocator> {
        match self {
            Self::InvalidCode | Self::CodeExpired => Some(FieldLocator::body("code")),
            _ => None,
        }
    }

    pub fn severity(&self) -> Option<OutcomeSeverity> {
        match self {
            Self::Valid => None,
            Self::FactorDisabled | Self::InvalidCode | Self::CodeExpired => {
                Some(OutcomeSeverity::ClientError)
            }
            Self::LookupFailed | Self::InternalError => Some(OutcomeSeverity::ServerError),
        }
    }
}

//! Authorization coordination module
//!
//! High-level entry points the transport boundary calls into: the MFA
//! verification engine and the OAuth2 authorization-code flow. Functions
//! here return discriminated outcomes and never propagate raw faults; a
//! storage or validator error is logged once and absorbed into the
//! internal-failure variant of the respective outcome.

mod mfa;
mod oauth2;

pub use mfa::{require_mfa_core, verify_mfa_core, verify_mfa_core_at};
pub use oauth2::{authorize_core, authorize_core_at};

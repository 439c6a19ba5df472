use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradepost_core::SubjectId;

/// Identity-token claims model (transport-agnostic).
///
/// This is the minimal set of claims tradepost expects once a token has been
/// decoded/verified by whatever identity provider is in use. Role precedence
/// (`admin` > `isStore` > customer) is applied by
/// [`crate::Principal::from_claims`], never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject identifier.
    pub sub: SubjectId,

    /// Email attribute carried into the principal.
    pub email: String,

    /// Administrator claim.
    #[serde(default)]
    pub admin: bool,

    /// Store-owner claim.
    #[serde(default, rename = "isStore")]
    pub is_store: bool,

    /// Whether the session completed an MFA challenge.
    #[serde(default, rename = "mfaVerified")]
    pub mfa_verified: bool,

    /// Issued-at timestamp (`iat`).
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp (`exp`).
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate claim time windows.
///
/// Note: this validates the *claims* only. Signature verification / decoding
/// is the verifier's job ([`crate::token`]).
pub fn validate_claims(
    claims: &IdentityClaims,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

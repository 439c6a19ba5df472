use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use tradepost_core::SubjectId;

use crate::claims::{IdentityClaims, TokenValidationError, validate_claims};

/// Session-invalidation watermark lookup.
///
/// A password change stamps the subject's watermark; any token issued before
/// it is no longer honored.
pub trait SessionWatermark: Send + Sync {
    fn invalidated_at(&self, subject: &SubjectId) -> Option<DateTime<Utc>>;
}

/// Closed verification-failure taxonomy.
///
/// `Display` text is generic by design; provider-internal detail stays in the
/// payload and is only ever attached to internal log metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("token has expired")]
    Expired,

    #[error("token has been revoked")]
    Revoked,

    #[error("token is invalid")]
    Invalid(String),

    #[error("identity provider unavailable")]
    Unavailable(String),
}

impl VerifyError {
    /// Internal diagnostic detail for audit metadata, never for responses.
    pub fn detail(&self) -> Option<&str> {
        match self {
            VerifyError::Invalid(d) | VerifyError::Unavailable(d) => Some(d),
            _ => None,
        }
    }
}

/// The identity-provider seam: verify a bearer token, revocation included.
///
/// Async so remote providers fit behind it; callers bound the wait with a
/// fixed timeout and map elapse to a service error, never to a denial.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError>;
}

/// HS256 token verifier with watermark-based revocation.
pub struct Hs256TokenVerifier {
    decoding: DecodingKey,
    validation: Validation,
    watermarks: Arc<dyn SessionWatermark>,
}

impl Hs256TokenVerifier {
    pub fn new(secret: &[u8], watermarks: Arc<dyn SessionWatermark>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time-window checks run through validate_claims so the error
        // taxonomy stays deterministic (no library leeway).
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            decoding: DecodingKey::from_secret(secret),
            validation,
            watermarks,
        }
    }
}

#[async_trait]
impl TokenVerifier for Hs256TokenVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError> {
        let decoded = jsonwebtoken::decode::<IdentityClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| VerifyError::Invalid(e.to_string()))?;
        let claims = decoded.claims;

        validate_claims(&claims, Utc::now()).map_err(|e| match e {
            TokenValidationError::Expired => VerifyError::Expired,
            TokenValidationError::NotYetValid | TokenValidationError::InvalidTimeWindow => {
                VerifyError::Invalid(e.to_string())
            }
        })?;

        if let Some(watermark) = self.watermarks.invalidated_at(&claims.sub) {
            if claims.issued_at < watermark {
                return Err(VerifyError::Revoked);
            }
        }

        Ok(claims)
    }
}

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use tradepost_auth::VerifyError;

/// Closed authentication-failure taxonomy for the HTTP boundary.
///
/// `Display` text is the externally visible message: generic and stable.
/// Provider-internal detail rides in the payload and is attached only to
/// audit metadata (or to responses under the dev-errors flag).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Invalid authentication token")]
    InvalidToken(String),

    #[error("Authentication service error")]
    ServiceError(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "MISSING_TOKEN",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenRevoked => "TOKEN_REVOKED",
            AuthError::InvalidToken(_) => "INVALID_TOKEN",
            AuthError::ServiceError(_) => "AUTH_SERVICE_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::ServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Internal diagnostic detail, never surfaced outside dev mode.
    pub fn detail(&self) -> Option<&str> {
        match self {
            AuthError::InvalidToken(d) | AuthError::ServiceError(d) => Some(d),
            _ => None,
        }
    }
}

impl From<VerifyError> for AuthError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Expired => AuthError::TokenExpired,
            VerifyError::Revoked => AuthError::TokenRevoked,
            VerifyError::Invalid(detail) => AuthError::InvalidToken(detail),
            VerifyError::Unavailable(detail) => AuthError::ServiceError(detail),
        }
    }
}

pub fn auth_error_response(err: &AuthError, dev_errors: bool) -> axum::response::Response {
    let mut body = json!({
        "error": true,
        "message": err.to_string(),
        "code": err.code(),
    });
    if dev_errors {
        if let Some(detail) = err.detail() {
            body["detail"] = json!(detail);
        }
    }
    (err.status(), Json(body)).into_response()
}

/// Authorization failure: generic by design, never names the missing
/// permission.
pub fn forbidden() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": true, "message": "Forbidden" })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": true,
            "message": message.into(),
            "code": code,
        })),
    )
        .into_response()
}

/// Internal failure with no leakable detail.
pub fn internal_error() -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "Internal server error",
    )
}

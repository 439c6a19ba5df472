use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::RequestContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo of the authenticated principal (debugging aid).
pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
    let principal = ctx.principal();
    Json(serde_json::json!({
        "subject": principal.subject.to_string(),
        "role": principal.role.as_str(),
        "email": principal.attrs.email,
        "mfaVerified": principal.attrs.mfa_verified,
    }))
}

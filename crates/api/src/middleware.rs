use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use tradepost_audit::{Metadata, MetadataValue};
use tradepost_auth::Principal;

use crate::app::errors::{self, AuthError};
use crate::app::services::AppServices;
use crate::context::{RequestContext, RequestMeta};

/// Token-verification middleware.
///
/// Produces a [`RequestContext`] for the handler chain or rejects the
/// request with a stable error code. Emits exactly one AUTHENTICATION audit
/// entry per invocation — success or failure — before returning control;
/// each entry is evidence for a specific request.
pub async fn auth_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let meta = RequestMeta::from_parts(req.method(), req.uri(), req.headers());

    match authenticate(&services, req.headers()).await {
        Ok(principal) => {
            let mut info = meta.unauthenticated_info();
            info.subject = Some(principal.subject);

            let mut metadata = Metadata::new();
            metadata.insert(
                "role".to_string(),
                MetadataValue::from(principal.role.as_str()),
            );
            services
                .logger
                .auth_attempt(&info, true, "token verified", metadata)
                .await;

            req.extensions_mut()
                .insert(RequestContext::new(principal, meta));
            next.run(req).await
        }
        Err(err) => {
            let mut metadata = Metadata::new();
            metadata.insert("code".to_string(), MetadataValue::from(err.code()));
            if let Some(detail) = err.detail() {
                metadata.insert("detail".to_string(), MetadataValue::from(detail));
            }
            services
                .logger
                .auth_attempt(
                    &meta.unauthenticated_info(),
                    false,
                    "token verification failed",
                    metadata,
                )
                .await;

            errors::auth_error_response(&err, services.config.dev_errors)
        }
    }
}

/// Verify the bearer token under the fixed provider timeout.
///
/// Timeout or an unexpected provider failure degrades to a service error —
/// never to "authenticated", and never to a denial.
async fn authenticate(
    services: &AppServices,
    headers: &HeaderMap,
) -> Result<Principal, AuthError> {
    let token = extract_bearer(headers)?;

    let verified = tokio::time::timeout(
        services.config.verify_timeout,
        services.verifier.verify(token),
    )
    .await
    .map_err(|_| AuthError::ServiceError("token verification timed out".to_string()))?;

    let claims = verified?;
    Ok(Principal::from_claims(&claims))
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;

    let header = header.to_str().map_err(|_| AuthError::MissingToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn missing_header_is_missing_token() {
        assert_eq!(
            extract_bearer(&headers_with(None)).unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn non_bearer_scheme_is_missing_token() {
        assert_eq!(
            extract_bearer(&headers_with(Some("Basic abc"))).unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn empty_bearer_token_is_missing_token() {
        assert_eq!(
            extract_bearer(&headers_with(Some("Bearer  "))).unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(
            extract_bearer(&headers_with(Some("Bearer abc.def.ghi"))).unwrap(),
            "abc.def.ghi"
        );
    }
}

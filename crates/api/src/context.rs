use axum::http::{HeaderMap, Method, Uri, header};

use tradepost_audit::RequestInfo;
use tradepost_auth::Principal;

/// Request facts known before authentication (transport metadata).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: String,
    pub user_agent: String,
    pub endpoint: String,
    pub method: String,
}

impl RequestMeta {
    pub fn from_parts(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Self {
            ip_address,
            user_agent,
            endpoint: uri.path().to_string(),
            method: method.as_str().to_string(),
        }
    }

    /// Audit view of this request before a principal exists.
    pub fn unauthenticated_info(&self) -> RequestInfo {
        RequestInfo {
            subject: None,
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            endpoint: self.endpoint.clone(),
            method: self.method.clone(),
        }
    }
}

/// Immutable per-request context.
///
/// Built exactly once by the token-verification middleware and threaded to
/// the route guard and handlers by value; nothing downstream mutates it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    principal: Principal,
    meta: RequestMeta,
}

impl RequestContext {
    pub fn new(principal: Principal, meta: RequestMeta) -> Self {
        Self { principal, meta }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    /// Audit view of this request.
    pub fn audit_info(&self) -> RequestInfo {
        RequestInfo {
            subject: self
                .principal
                .is_authenticated()
                .then_some(self.principal.subject),
            ip_address: self.meta.ip_address.clone(),
            user_agent: self.meta.user_agent.clone(),
            endpoint: self.meta.endpoint.clone(),
            method: self.meta.method.clone(),
        }
    }
}

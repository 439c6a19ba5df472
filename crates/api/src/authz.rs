//! API-side authorization guard.
//!
//! This enforces route requirements before handler logic runs, while keeping
//! the decision engine itself free of HTTP and logging concerns. Every deny
//! is logged before the generic 403 leaves the boundary.

use axum::response::Response;

use tradepost_audit::{Metadata, MetadataValue, Severity};
use tradepost_auth::{Decision, Requirement, decide};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestContext;

/// Check a route requirement in the current request context.
///
/// Intended to be called at the top of a handler, **before** any route
/// logic. On deny, exactly one AUTHORIZATION entry (endpoint + method
/// included) is recorded and the generic 403 is returned.
pub async fn require(
    services: &AppServices,
    ctx: &RequestContext,
    requirement: &Requirement,
) -> Result<(), Response> {
    match decide(ctx.principal(), requirement) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            let mut metadata = Metadata::new();
            metadata.insert("reason".to_string(), MetadataValue::from(reason.as_str()));
            metadata.insert(
                "role".to_string(),
                MetadataValue::from(ctx.principal().role.as_str()),
            );
            services
                .logger
                .access_control_failure(&ctx.audit_info(), "authorization denied", metadata)
                .await;

            Err(errors::forbidden())
        }
    }
}

/// Admin-tagged guard: on allow, also records the successful access.
pub async fn require_admin(
    services: &AppServices,
    ctx: &RequestContext,
) -> Result<(), Response> {
    require(services, ctx, &Requirement::admin_only()).await?;

    services
        .logger
        .security_event(
            &ctx.audit_info(),
            "authorization.admin_access",
            Severity::Low,
            Some(true),
            "admin route access granted",
            Metadata::new(),
        )
        .await;

    Ok(())
}

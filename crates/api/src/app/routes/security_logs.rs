//! Admin read path over the audit trail.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use tradepost_audit::{AuditQueryError, EventCategory, LogQuery, Metadata, MetadataValue};

use crate::app::dto::SecurityLogsQuery;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::RequestContext;

/// GET /security-logs?category&startDate&endDate&limit (admin-only).
pub async fn list_security_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<SecurityLogsQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&services, &ctx).await {
        return resp;
    }

    let category = match params.category.as_deref() {
        None => None,
        Some(raw) => match EventCategory::parse(raw) {
            Some(category) => Some(category),
            None => {
                services
                    .logger
                    .validation_failure(
                        &ctx.audit_info(),
                        "security log query rejected: unknown category",
                        Metadata::new(),
                    )
                    .await;
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_FAILED",
                    "Invalid category",
                );
            }
        },
    };

    let query = LogQuery {
        category,
        start: params.start_date,
        end: params.end_date,
        limit: params.limit,
    };

    match services
        .logger
        .query(&ctx.audit_info(), ctx.principal().subject, query)
        .await
    {
        Ok(logs) => {
            let count = logs.len();
            (
                StatusCode::OK,
                Json(json!({ "success": true, "logs": logs, "count": count })),
            )
                .into_response()
        }
        Err(AuditQueryError::AccessDenied) => directory_denial(&services, &ctx).await,
        Err(e) => {
            tracing::error!(error = %e, "audit log query failed");
            errors::internal_error()
        }
    }
}

/// GET /log-stats (admin-only): last-24h counts by category.
pub async fn log_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_admin(&services, &ctx).await {
        return resp;
    }

    match services
        .logger
        .stats(&ctx.audit_info(), ctx.principal().subject)
        .await
    {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({ "success": true, "stats": stats })),
        )
            .into_response(),
        Err(AuditQueryError::AccessDenied) => directory_denial(&services, &ctx).await,
        Err(e) => {
            tracing::error!(error = %e, "audit stats query failed");
            errors::internal_error()
        }
    }
}

/// The logger re-verifies the admin role against the directory; a token
/// claiming admin for a non-admin record is denied here.
async fn directory_denial(
    services: &AppServices,
    ctx: &RequestContext,
) -> axum::response::Response {
    let mut metadata = Metadata::new();
    metadata.insert(
        "reason".to_string(),
        MetadataValue::from("directory_admin_check_failed"),
    );
    services
        .logger
        .access_control_failure(&ctx.audit_info(), "authorization denied", metadata)
        .await;
    errors::forbidden()
}

//! Credential-change flow.
//!
//! Order of gates: prove the current password, validate the candidate
//! against policy, enforce minimum age and non-reuse, then commit the new
//! head record and the session-invalidation watermark in one record update.
//! Argon2 work runs on the blocking pool so a slow hash check cannot stall
//! unrelated requests.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use tradepost_audit::{Metadata, MetadataValue, Severity};
use tradepost_auth::{ChangeDenied, Requirement, can_change, password};
use tradepost_infra::{CredentialStore, CredentialStoreError};

use crate::app::dto::ChangePasswordRequest;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::RequestContext;

pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<ChangePasswordRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&services, &ctx, &Requirement::authenticated()).await {
        return resp;
    }

    let subject = ctx.principal().subject;

    let record = match services.credentials.get(&subject).await {
        Ok(record) => record,
        Err(CredentialStoreError::NotFound) => {
            // An authenticated principal without a credential record cannot
            // prove its current password.
            services
                .logger
                .auth_attempt(
                    &ctx.audit_info(),
                    false,
                    "password change rejected: no credential record",
                    Metadata::new(),
                )
                .await;
            return wrong_current_password();
        }
        Err(e) => {
            tracing::error!(error = %e, "credential store read failed");
            return errors::internal_error();
        }
    };

    let Some(current) = record.history.current().cloned() else {
        tracing::error!(subject = %subject, "credential record has an empty password history");
        return errors::internal_error();
    };

    // Prove the current password before touching anything else.
    let supplied = body.current_password.clone();
    let current_hash = current.hash.clone();
    let current_ok =
        match tokio::task::spawn_blocking(move || password::verify(&supplied, &current_hash)).await
        {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "stored password digest unreadable");
                return errors::internal_error();
            }
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                return errors::internal_error();
            }
        };

    if !current_ok {
        let mut metadata = Metadata::new();
        metadata.insert("flow".to_string(), MetadataValue::from("change-password"));
        services
            .logger
            .auth_attempt(
                &ctx.audit_info(),
                false,
                "password change rejected: current password mismatch",
                metadata,
            )
            .await;
        return wrong_current_password();
    }

    // Every policy violation is reported at once.
    let check = password::validate(&body.new_password);
    if !check.is_valid {
        let mut metadata = Metadata::new();
        metadata.insert(
            "violationCount".to_string(),
            MetadataValue::from(check.errors.len()),
        );
        metadata.insert("score".to_string(), MetadataValue::from(check.score as i64));
        services
            .logger
            .validation_failure(
                &ctx.audit_info(),
                "password change rejected: candidate failed policy",
                metadata,
            )
            .await;

        let messages: Vec<&'static str> = check.errors.iter().map(|v| v.message()).collect();
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "state": "error",
                "code": "VALIDATION_FAILED",
                "message": "Password does not meet policy requirements",
                "errors": messages,
            })),
        )
            .into_response();
    }

    // Minimum age + reuse over the bounded history, using the same verify
    // primitive as the current-password proof.
    let history = record.history.clone();
    let last_changed_at = current.changed_at;
    let candidate = body.new_password.clone();
    let gate = tokio::task::spawn_blocking(move || {
        can_change(Utc::now(), last_changed_at, &history, |hash| {
            password::verify(&candidate, hash).unwrap_or(false)
        })
    })
    .await;

    match gate {
        Ok(Ok(())) => {}
        Ok(Err(denied)) => return lifecycle_rejection(&services, &ctx, denied).await,
        Err(e) => {
            tracing::error!(error = %e, "password history task failed");
            return errors::internal_error();
        }
    }

    let candidate = body.new_password.clone();
    let new_hash = match tokio::task::spawn_blocking(move || password::hash(&candidate)).await {
        Ok(Ok(hash)) => hash,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "password hashing failed");
            return errors::internal_error();
        }
        Err(e) => {
            tracing::error!(error = %e, "password hashing task failed");
            return errors::internal_error();
        }
    };

    // One read-modify-write: the new head record and the invalidation
    // watermark can never diverge.
    let now = Utc::now();
    let update = services
        .credentials
        .update(
            &subject,
            Box::new(move |rec| {
                rec.history.push(new_hash, now);
                rec.sessions_invalidated_at = Some(now);
            }),
        )
        .await;
    if let Err(e) = update {
        tracing::error!(error = %e, "credential update failed");
        return errors::internal_error();
    }

    let mut metadata = Metadata::new();
    metadata.insert("score".to_string(), MetadataValue::from(check.score as i64));
    services
        .logger
        .security_event(
            &ctx.audit_info(),
            "password.changed",
            Severity::Low,
            Some(true),
            "password changed; sessions issued earlier are invalidated",
            metadata,
        )
        .await;

    (StatusCode::OK, Json(json!({ "state": "success" }))).into_response()
}

fn wrong_current_password() -> axum::response::Response {
    errors::json_error(
        StatusCode::UNAUTHORIZED,
        "INVALID_CREDENTIALS",
        "Current password is incorrect",
    )
}

async fn lifecycle_rejection(
    services: &AppServices,
    ctx: &RequestContext,
    denied: ChangeDenied,
) -> axum::response::Response {
    let (code, message) = match denied {
        ChangeDenied::TooRecent => (
            "TOO_RECENT",
            "Password must be at least 24 hours old before it can be changed again",
        ),
        ChangeDenied::Reused => ("REUSED", "Password was used recently and cannot be reused"),
    };

    let mut metadata = Metadata::new();
    metadata.insert("code".to_string(), MetadataValue::from(code));
    services
        .logger
        .security_event(
            &ctx.audit_info(),
            "password.change_rejected",
            Severity::Low,
            Some(false),
            "password change rejected by lifecycle policy",
            metadata,
        )
        .await;

    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "state": "error", "code": code, "message": message })),
    )
        .into_response()
}

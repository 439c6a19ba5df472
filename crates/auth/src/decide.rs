use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;

use crate::{Permission, Principal, Requirement, Role, role_permissions};

/// Outcome of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Why a principal was denied.
///
/// Reasons are for the audit trail only; the HTTP boundary always responds
/// with a generic "Forbidden".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotAuthenticated,
    MfaRequired,
    RoleNotPermitted,
    MissingPermission,
    PredicateRejected,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotAuthenticated => "not_authenticated",
            DenyReason::MfaRequired => "mfa_required",
            DenyReason::RoleNotPermitted => "role_not_permitted",
            DenyReason::MissingPermission => "missing_permission",
            DenyReason::PredicateRejected => "predicate_rejected",
        }
    }
}

/// Decide whether `principal` satisfies `requirement`.
///
/// - No IO
/// - Deterministic: identical inputs yield identical results
/// - Fail-closed: gates short-circuit toward Deny and can only narrow access
///
/// Distinguishing "no principal" (401) from "insufficient rights" (403) is a
/// boundary concern, not this function's.
pub fn decide(principal: &Principal, requirement: &Requirement) -> Decision {
    if requirement.require_auth && principal.role == Role::Guest {
        return Decision::Deny(DenyReason::NotAuthenticated);
    }

    if requirement.require_mfa && !principal.attrs.mfa_verified {
        return Decision::Deny(DenyReason::MfaRequired);
    }

    // Admin is a strict superset of every role, so the role gate never
    // excludes it; seller-specific restrictions are not inferred.
    if !requirement.roles.is_empty()
        && principal.role != Role::Admin
        && !requirement.roles.contains(&principal.role)
    {
        return Decision::Deny(DenyReason::RoleNotPermitted);
    }

    let granted: HashSet<&str> = role_permissions(principal.role)
        .iter()
        .map(|p| p.as_str())
        .collect();
    let wildcard = granted.contains("*");
    let satisfied = |p: &Permission| wildcard || granted.contains(p.as_str());

    if !requirement.all_of.is_empty() && !requirement.all_of.iter().all(satisfied) {
        return Decision::Deny(DenyReason::MissingPermission);
    }
    if !requirement.any_of.is_empty() && !requirement.any_of.iter().any(satisfied) {
        return Decision::Deny(DenyReason::MissingPermission);
    }

    if let Some(predicate) = &requirement.predicate {
        // A panicking predicate must deny, never allow.
        let passed = catch_unwind(AssertUnwindSafe(|| predicate(&principal.attrs)))
            .unwrap_or(false);
        if !passed {
            return Decision::Deny(DenyReason::PredicateRejected);
        }
    }

    Decision::Allow
}

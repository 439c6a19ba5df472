use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tradepost_core::SubjectId;

use crate::claims::IdentityClaims;

/// Role of an authenticated (or anonymous) caller.
///
/// Roles form a closed set; permission grants per role live in
/// [`crate::permissions`]. Admin is a strict superset of every other role via
/// the wildcard grant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Customer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Customer => "customer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes carried alongside the role for predicate (ABAC) checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalAttrs {
    pub email: String,
    pub is_store: bool,
    pub mfa_verified: bool,
}

/// The authenticated identity derived from a verified token for one request.
///
/// Derived per request, never persisted. Role is computed from claims only —
/// never trusted from a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: SubjectId,
    pub role: Role,
    pub attrs: PrincipalAttrs,
}

impl Principal {
    /// The zero-value principal used when no valid token is present.
    pub fn guest() -> Self {
        Self {
            subject: SubjectId::from_uuid(Uuid::nil()),
            role: Role::Guest,
            attrs: PrincipalAttrs::default(),
        }
    }

    /// Total mapping from verified claims to a principal.
    ///
    /// Precedence: `admin` > `isStore` > customer. Any valid token implies at
    /// least an authenticated customer.
    pub fn from_claims(claims: &IdentityClaims) -> Self {
        let role = if claims.admin {
            Role::Admin
        } else if claims.is_store {
            Role::Seller
        } else {
            Role::Customer
        };

        Self {
            subject: claims.sub,
            role,
            attrs: PrincipalAttrs {
                email: claims.email.clone(),
                is_store: claims.is_store,
                mfa_verified: claims.mfa_verified,
            },
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role != Role::Guest
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::guest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn claims(admin: bool, is_store: bool) -> IdentityClaims {
        let now = Utc::now();
        IdentityClaims {
            sub: SubjectId::new(),
            email: "user@example.com".to_string(),
            admin,
            is_store,
            mfa_verified: false,
            issued_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn guest_is_the_default() {
        let p = Principal::default();
        assert_eq!(p.role, Role::Guest);
        assert!(!p.is_authenticated());
    }

    #[test]
    fn valid_claims_imply_at_least_customer() {
        let p = Principal::from_claims(&claims(false, false));
        assert_eq!(p.role, Role::Customer);
        assert!(p.is_authenticated());
    }

    #[test]
    fn store_claim_maps_to_seller() {
        let p = Principal::from_claims(&claims(false, true));
        assert_eq!(p.role, Role::Seller);
        assert!(p.attrs.is_store);
    }

    #[test]
    fn admin_claim_wins_over_store() {
        let p = Principal::from_claims(&claims(true, true));
        assert_eq!(p.role, Role::Admin);
    }
}

use std::borrow::Cow;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are modeled as opaque `resource:action` strings
/// (e.g. "product:read"). The special wildcard permission `"*"` indicates
/// "allow all" without hardcoding domain permissions into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

struct RoleGrants {
    guest: Vec<Permission>,
    customer: Vec<Permission>,
    seller: Vec<Permission>,
    admin: Vec<Permission>,
}

impl RoleGrants {
    fn build() -> Self {
        let p = |names: &[&'static str]| names.iter().map(|n| Permission::new(*n)).collect();

        Self {
            guest: p(&["product:read"]),
            customer: p(&[
                "product:read",
                "cart:read",
                "cart:update",
                "order:create",
                "order:read",
                "profile:read",
                "profile:update",
            ]),
            seller: p(&[
                "product:read",
                "product:create",
                "product:update",
                "product:delete",
                "shop:read",
                "shop:update",
                "order:read",
                "order:update",
                "profile:read",
                "profile:update",
            ]),
            // Admin is a strict superset of every role.
            admin: p(&["*"]),
        }
    }
}

static GRANTS: OnceLock<RoleGrants> = OnceLock::new();

/// Static role→permission grants.
///
/// Built once at process start, never mutated at runtime.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    let grants = GRANTS.get_or_init(RoleGrants::build);
    match role {
        Role::Guest => &grants.guest,
        Role::Customer => &grants.customer,
        Role::Seller => &grants.seller,
        Role::Admin => &grants.admin,
    }
}

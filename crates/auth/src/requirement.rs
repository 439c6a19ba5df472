use std::collections::HashSet;
use std::sync::Arc;

use crate::{Permission, PrincipalAttrs, Role};

/// Attribute predicate layered on top of RBAC (the ABAC escape hatch).
pub type AttrPredicate = Arc<dyn Fn(&PrincipalAttrs) -> bool + Send + Sync>;

/// What a protected operation demands of its caller.
///
/// Declared once by the route owner and treated as immutable. Each field can
/// only narrow access; an empty role set means "any role".
#[derive(Clone, Default)]
pub struct Requirement {
    pub require_auth: bool,
    pub require_mfa: bool,
    pub roles: HashSet<Role>,
    pub any_of: HashSet<Permission>,
    pub all_of: HashSet<Permission>,
    pub predicate: Option<AttrPredicate>,
}

impl Requirement {
    /// No constraints: guests pass.
    pub fn public() -> Self {
        Self::default()
    }

    /// Any authenticated principal.
    pub fn authenticated() -> Self {
        Self {
            require_auth: true,
            ..Self::default()
        }
    }

    /// Authenticated administrators only.
    pub fn admin_only() -> Self {
        Self {
            require_auth: true,
            roles: HashSet::from([Role::Admin]),
            ..Self::default()
        }
    }

    pub fn with_mfa(mut self) -> Self {
        self.require_mfa = true;
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    pub fn with_all_of(mut self, perms: impl IntoIterator<Item = Permission>) -> Self {
        self.all_of = perms.into_iter().collect();
        self
    }

    pub fn with_any_of(mut self, perms: impl IntoIterator<Item = Permission>) -> Self {
        self.any_of = perms.into_iter().collect();
        self
    }

    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&PrincipalAttrs) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }
}

impl core::fmt::Debug for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Requirement")
            .field("require_auth", &self.require_auth)
            .field("require_mfa", &self.require_mfa)
            .field("roles", &self.roles)
            .field("any_of", &self.any_of)
            .field("all_of", &self.all_of)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

//! Base contract system

use camp_core::error::ValidationErrors;
use camp_core::traits::Id;
use camp_models::Role;

/// Result of contract validation
pub type ValidationResult = Result<(), ValidationErrors>;

/// The caller an operation runs on behalf of
pub trait UserContext: Send + Sync {
    fn id(&self) -> Id;
    fn role(&self) -> Role;
    /// `None` for HQ admins
    fn tenant_id(&self) -> Option<Id>;

    fn is_hq(&self) -> bool {
        self.role().is_hq()
    }

    /// HQ sees every tenant; everyone else only their own
    fn can_access_tenant(&self, tenant_id: Id) -> bool {
        self.is_hq() || self.tenant_id() == Some(tenant_id)
    }
}

/// Base contract trait
pub trait Contract<T>: Send + Sync {
    /// Validate the entity
    fn validate(&self, entity: &T) -> ValidationResult;

    /// Check if an attribute is writable
    fn is_writable(&self, _attribute: &str) -> bool {
        true
    }
}

/// Minimal `UserContext` for background jobs and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Id,
    pub role: Role,
    pub tenant_id: Option<Id>,
}

impl Actor {
    pub fn new(id: Id, role: Role, tenant_id: Option<Id>) -> Self {
        Self { id, role, tenant_id }
    }

    pub fn hq(id: Id) -> Self {
        Self::new(id, Role::HqAdmin, None)
    }
}

impl UserContext for Actor {
    fn id(&self) -> Id {
        self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn tenant_id(&self) -> Option<Id> {
        self.tenant_id
    }
}

/// Push the derive-level errors of `value` into `errors`
pub fn collect_derive_errors<T: validator::Validate>(value: &T, errors: &mut ValidationErrors) {
    if let Err(derive_errors) = value.validate() {
        errors.merge(derive_errors.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_access() {
        let hq = Actor::hq(1);
        assert!(hq.can_access_tenant(42));

        let owner = Actor::new(2, Role::LicenseeOwner, Some(7));
        assert!(owner.can_access_tenant(7));
        assert!(!owner.can_access_tenant(8));
    }
}

//! Role matrix
//!
//! Who may call what. Tenant isolation is a separate check
//! ([`ensure_tenant`]): a row of another tenant is reported as not found so
//! its existence does not leak.

use camp_core::{CampError, CampResult, Id};
use camp_models::Role;

use crate::base::UserContext;

/// Gated operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create tenants, change status, edit royalty terms
    ManageTenants,
    /// Edit name, contact email and territory of a tenant
    EditTenantProfile,
    /// Create staff accounts
    ManageUsers,
    /// Camps, venues, contracts, compensation plans, promo codes
    ManageCamps,
    /// Record camp results, staff assignments, grouping
    ManageCampStaff,
    /// Check-in, roster, kiosk
    CheckIn,
    ViewCampOverview,
    /// List a camp's registrations
    ViewRegistrations,
    Checkout,
    CancelRegistration,
    Refund,
    /// Add and edit athletes
    ManageAthletes,
    ViewRoyaltyStatement,
    /// Issue and mark invoices
    ManageInvoices,
    ViewInvoices,
    ViewDashboard,
    ViewAnalytics,
    ViewOwnPayouts,
}

impl Action {
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Role::*;
        match self {
            Action::ManageTenants | Action::ManageInvoices | Action::ViewDashboard => &[HqAdmin],
            Action::EditTenantProfile
            | Action::ManageUsers
            | Action::ManageCamps
            | Action::Refund
            | Action::ViewRoyaltyStatement
            | Action::ViewInvoices
            | Action::ViewAnalytics => &[HqAdmin, LicenseeOwner],
            Action::ManageCampStaff | Action::ViewRegistrations => {
                &[HqAdmin, LicenseeOwner, Director]
            }
            Action::CheckIn | Action::ViewCampOverview => &[HqAdmin, LicenseeOwner, Director, Coach],
            Action::Checkout | Action::CancelRegistration => {
                &[HqAdmin, LicenseeOwner, Director, Parent]
            }
            Action::ManageAthletes => &[HqAdmin, LicenseeOwner, Director, Parent],
            Action::ViewOwnPayouts => &[Director, Coach],
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// 403 unless the caller's role may perform `action`
pub fn authorize<U: UserContext + ?Sized>(user: &U, action: Action) -> CampResult<()> {
    if action.permits(user.role()) {
        Ok(())
    } else {
        Err(CampError::forbidden("You are not allowed to perform this action"))
    }
}

/// 404 unless `tenant_id` is visible to the caller
pub fn ensure_tenant<U: UserContext + ?Sized>(
    user: &U,
    tenant_id: Id,
    entity: &'static str,
    id: Id,
) -> CampResult<()> {
    if user.can_access_tenant(tenant_id) {
        Ok(())
    } else {
        Err(CampError::not_found(entity, id))
    }
}

/// The tenant a non-HQ caller works in, or the explicit one HQ passed
pub fn effective_tenant<U: UserContext + ?Sized>(
    user: &U,
    requested: Option<Id>,
) -> CampResult<Id> {
    match (user.tenant_id(), requested) {
        (Some(own), _) => Ok(own),
        (None, Some(requested)) => Ok(requested),
        (None, None) => Err(CampError::invalid("tenant_id", "is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Actor;

    #[test]
    fn test_matrix_rows() {
        assert!(Action::ViewDashboard.permits(Role::HqAdmin));
        assert!(!Action::ViewDashboard.permits(Role::LicenseeOwner));
        assert!(Action::Refund.permits(Role::LicenseeOwner));
        assert!(!Action::Refund.permits(Role::Director));
        assert!(Action::CheckIn.permits(Role::Coach));
        assert!(!Action::CheckIn.permits(Role::Parent));
        assert!(Action::Checkout.permits(Role::Parent));
        assert!(!Action::Checkout.permits(Role::Coach));
        assert!(Action::ManageCampStaff.permits(Role::Director));
        assert!(!Action::ManageCamps.permits(Role::Director));
    }

    #[test]
    fn test_authorize_and_tenant_checks() {
        let coach = Actor::new(3, Role::Coach, Some(1));
        assert!(authorize(&coach, Action::CheckIn).is_ok());
        assert_eq!(authorize(&coach, Action::Refund).unwrap_err().status_code(), 403);

        let err = ensure_tenant(&coach, 2, "Camp", 99).unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(ensure_tenant(&Actor::hq(1), 2, "Camp", 99).is_ok());
    }

    #[test]
    fn test_effective_tenant() {
        let owner = Actor::new(2, Role::LicenseeOwner, Some(5));
        assert_eq!(effective_tenant(&owner, Some(9)).unwrap(), 5);
        assert_eq!(effective_tenant(&Actor::hq(1), Some(9)).unwrap(), 9);
        assert!(effective_tenant(&Actor::hq(1), None).is_err());
    }
}

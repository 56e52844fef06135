//! Staff compensation models
//!
//! Tables: compensation_plans, staff_assignments, staff_payouts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use camp_core::{BasisPoints, Cents};

use crate::{Id, Role, TenantScoped};

text_enum! {
    /// Role a staff member works a camp in
    pub enum StaffRole {
        Director => "director",
        Coach => "coach",
    }
}

impl StaffRole {
    /// Whether a user holding `role` may be assigned as `self`
    ///
    /// Directors may also coach; coaches may not direct.
    pub fn accepts(&self, role: Role) -> bool {
        match self {
            StaffRole::Director => role == Role::Director,
            StaffRole::Coach => matches!(role, Role::Coach | Role::Director),
        }
    }
}

/// How a staff role is paid for one camp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationPlan {
    pub id: Id,
    pub tenant_id: Id,
    pub name: String,
    pub role: StaffRole,
    pub base_stipend_cents: Cents,
    /// Enrollment at which the bonus starts (inclusive)
    pub enrollment_threshold: Option<i32>,
    pub enrollment_bonus_cents: Cents,
    /// Paid for every camper above the threshold
    pub per_camper_bonus_cents: Cents,
    /// Share of the camp's net revenue
    pub revenue_share: BasisPoints,
    /// Survey score (0..=100) at which the bonus is paid (inclusive)
    pub satisfaction_threshold: Option<i32>,
    pub satisfaction_bonus_cents: Cents,
    /// Paid when actual expenses stay within budget
    pub budget_bonus_cents: Cents,
    pub max_payout_cents: Option<Cents>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantScoped for CompensationPlan {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}

/// A staff member working a camp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub id: Id,
    pub tenant_id: Id,
    pub camp_id: Id,
    pub user_id: Id,
    pub role: StaffRole,
    pub plan_id: Option<Id>,
    pub created_at: DateTime<Utc>,
}

impl TenantScoped for StaffAssignment {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}

/// Finalized payout for one assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffPayout {
    pub id: Id,
    pub tenant_id: Id,
    pub camp_id: Id,
    pub assignment_id: Id,
    pub user_id: Id,
    pub plan_id: Id,
    pub amount_cents: Cents,
    /// Line items the amount was computed from
    pub breakdown: serde_json::Value,
    pub finalized_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_role_accepts() {
        assert!(StaffRole::Director.accepts(Role::Director));
        assert!(!StaffRole::Director.accepts(Role::Coach));
        assert!(StaffRole::Coach.accepts(Role::Coach));
        assert!(StaffRole::Coach.accepts(Role::Director));
        assert!(!StaffRole::Coach.accepts(Role::Parent));
    }
}

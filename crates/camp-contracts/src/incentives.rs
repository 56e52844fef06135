//! Compensation plan and staffing contracts

use serde::Deserialize;
use validator::Validate;

use camp_core::error::ValidationErrors;
use camp_core::Id;
use camp_models::{GroupStrategy, StaffRole};

use crate::base::{collect_derive_errors, Contract, ValidationResult};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlanAttributes {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: String,
    pub role: StaffRole,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub base_stipend_cents: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub enrollment_threshold: Option<i32>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub enrollment_bonus_cents: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub per_camper_bonus_cents: i64,
    #[validate(range(max = 10000, message = "must not exceed 10000 basis points"))]
    pub revenue_share: u32,
    #[validate(range(min = 0, max = 100, message = "must be between 0 and 100"))]
    pub satisfaction_threshold: Option<i32>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub satisfaction_bonus_cents: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub budget_bonus_cents: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub max_payout_cents: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// HQ creating for a tenant
    pub tenant_id: Option<Id>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanParams {
    pub name: Option<String>,
    pub base_stipend_cents: Option<i64>,
    pub enrollment_threshold: Option<i32>,
    pub enrollment_bonus_cents: Option<i64>,
    pub per_camper_bonus_cents: Option<i64>,
    pub revenue_share: Option<u32>,
    pub satisfaction_threshold: Option<i32>,
    pub satisfaction_bonus_cents: Option<i64>,
    pub budget_bonus_cents: Option<i64>,
    pub max_payout_cents: Option<i64>,
    pub active: Option<bool>,
}

impl UpdatePlanParams {
    pub fn apply_to(self, attrs: &mut PlanAttributes) {
        if let Some(v) = self.name {
            attrs.name = v;
        }
        if let Some(v) = self.base_stipend_cents {
            attrs.base_stipend_cents = v;
        }
        if self.enrollment_threshold.is_some() {
            attrs.enrollment_threshold = self.enrollment_threshold;
        }
        if let Some(v) = self.enrollment_bonus_cents {
            attrs.enrollment_bonus_cents = v;
        }
        if let Some(v) = self.per_camper_bonus_cents {
            attrs.per_camper_bonus_cents = v;
        }
        if let Some(v) = self.revenue_share {
            attrs.revenue_share = v;
        }
        if self.satisfaction_threshold.is_some() {
            attrs.satisfaction_threshold = self.satisfaction_threshold;
        }
        if let Some(v) = self.satisfaction_bonus_cents {
            attrs.satisfaction_bonus_cents = v;
        }
        if let Some(v) = self.budget_bonus_cents {
            attrs.budget_bonus_cents = v;
        }
        if self.max_payout_cents.is_some() {
            attrs.max_payout_cents = self.max_payout_cents;
        }
        if let Some(v) = self.active {
            attrs.active = v;
        }
    }
}

pub struct PlanContract;

impl Contract<PlanAttributes> for PlanContract {
    fn validate(&self, attrs: &PlanAttributes) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(attrs, &mut errors);
        if attrs.enrollment_threshold.is_none()
            && (attrs.enrollment_bonus_cents > 0 || attrs.per_camper_bonus_cents > 0)
        {
            errors.add("enrollment_threshold", "is required for enrollment bonuses");
        }
        if attrs.satisfaction_threshold.is_none() && attrs.satisfaction_bonus_cents > 0 {
            errors.add("satisfaction_threshold", "is required for a satisfaction bonus");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignStaffParams {
    pub user_id: Id,
    pub role: StaffRole,
    pub plan_id: Option<Id>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateGroupsParams {
    pub strategy: GroupStrategy,
    pub max_group_size: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveCamperParams {
    pub athlete_id: Id,
    pub group_id: Id,
}

pub struct GroupingContract;

impl Contract<GenerateGroupsParams> for GroupingContract {
    fn validate(&self, params: &GenerateGroupsParams) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        if !(1..=100).contains(&params.max_group_size) {
            errors.add("max_group_size", "must be between 1 and 100");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> PlanAttributes {
        PlanAttributes {
            name: "Director standard".into(),
            role: StaffRole::Director,
            base_stipend_cents: 100_000,
            enrollment_threshold: Some(20),
            enrollment_bonus_cents: 25_000,
            per_camper_bonus_cents: 1_000,
            revenue_share: 500,
            satisfaction_threshold: Some(90),
            satisfaction_bonus_cents: 10_000,
            budget_bonus_cents: 5_000,
            max_payout_cents: Some(300_000),
            active: true,
            tenant_id: None,
        }
    }

    #[test]
    fn test_plan_rules() {
        assert!(PlanContract.validate(&plan()).is_ok());

        let mut bad = plan();
        bad.revenue_share = 12_000;
        bad.satisfaction_threshold = Some(120);
        bad.base_stipend_cents = -5;
        let errors = PlanContract.validate(&bad).unwrap_err();
        assert!(errors.has_error("revenue_share"));
        assert!(errors.has_error("satisfaction_threshold"));
        assert!(errors.has_error("base_stipend_cents"));
    }

    #[test]
    fn test_bonus_requires_threshold() {
        let mut bad = plan();
        bad.enrollment_threshold = None;
        assert!(PlanContract
            .validate(&bad)
            .unwrap_err()
            .has_error("enrollment_threshold"));
    }

    #[test]
    fn test_group_size_bounds() {
        let params = GenerateGroupsParams {
            strategy: GroupStrategy::Age,
            max_group_size: 0,
        };
        assert!(GroupingContract.validate(&params).is_err());
        let ok = GenerateGroupsParams {
            strategy: GroupStrategy::Grade,
            max_group_size: 100,
        };
        assert!(GroupingContract.validate(&ok).is_ok());
    }
}

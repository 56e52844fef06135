//! Staff incentives
//!
//! Compensation plans, payout previews and finalization, and the post-camp
//! results the bonuses depend on.

pub mod calculator;

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, instrument};

use camp_contracts::camps::{CampResultsContract, CampResultsParams};
use camp_contracts::incentives::{PlanAttributes, PlanContract, UpdatePlanParams};
use camp_contracts::permissions::effective_tenant;
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::{BasisPoints, CampError, CampResult, Cents, Id};
use camp_db::{IncentiveRepository, NewPayout, PlanValues, Repository};
use camp_models::{
    Camp, CampStatus, CompensationPlan, RegistrationStatus, StaffAssignment, StaffPayout, StaffRole,
};

use crate::base::{commit, scoped};
use crate::context::ServiceContext;

pub use calculator::{compute_payout, CampMetrics, PayoutBreakdown};

/// Payout a staff member would get if the camp were finalized now
#[derive(Debug, Clone, Serialize)]
pub struct PayoutPreview {
    pub assignment_id: Id,
    pub user_id: Id,
    pub user_name: String,
    pub role: StaffRole,
    pub plan_id: Option<Id>,
    pub plan_name: Option<String>,
    /// `None` when no plan applies
    pub breakdown: Option<PayoutBreakdown>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampIncentives {
    pub camp_id: Id,
    pub metrics: CampMetrics,
    pub payouts: Vec<PayoutPreview>,
    /// Payouts already stored for this camp
    pub finalized: Vec<StaffPayout>,
}

fn plan_values(attrs: &PlanAttributes) -> PlanValues {
    PlanValues {
        name: attrs.name.trim().to_string(),
        role: attrs.role,
        base_stipend_cents: Cents(attrs.base_stipend_cents),
        enrollment_threshold: attrs.enrollment_threshold,
        enrollment_bonus_cents: Cents(attrs.enrollment_bonus_cents),
        per_camper_bonus_cents: Cents(attrs.per_camper_bonus_cents),
        revenue_share: BasisPoints(attrs.revenue_share),
        satisfaction_threshold: attrs.satisfaction_threshold,
        satisfaction_bonus_cents: Cents(attrs.satisfaction_bonus_cents),
        budget_bonus_cents: Cents(attrs.budget_bonus_cents),
        max_payout_cents: attrs.max_payout_cents.map(Cents),
        active: attrs.active,
    }
}

fn plan_attributes(plan: &CompensationPlan) -> PlanAttributes {
    PlanAttributes {
        name: plan.name.clone(),
        role: plan.role,
        base_stipend_cents: plan.base_stipend_cents.value(),
        enrollment_threshold: plan.enrollment_threshold,
        enrollment_bonus_cents: plan.enrollment_bonus_cents.value(),
        per_camper_bonus_cents: plan.per_camper_bonus_cents.value(),
        revenue_share: plan.revenue_share.value(),
        satisfaction_threshold: plan.satisfaction_threshold,
        satisfaction_bonus_cents: plan.satisfaction_bonus_cents.value(),
        budget_bonus_cents: plan.budget_bonus_cents.value(),
        max_payout_cents: plan.max_payout_cents.map(Cents::value),
        active: plan.active,
        tenant_id: Some(plan.tenant_id),
    }
}

/// The assignment's own plan, else the first active plan for its role
pub fn plan_for<'p>(
    assignment: &StaffAssignment,
    plans: &'p [CompensationPlan],
) -> Option<&'p CompensationPlan> {
    match assignment.plan_id {
        Some(id) => plans
            .iter()
            .find(|plan| plan.id == id && plan.role == assignment.role),
        None => plans
            .iter()
            .filter(|plan| plan.active && plan.role == assignment.role)
            .min_by_key(|plan| plan.id),
    }
}

pub struct IncentiveService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> IncentiveService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    pub async fn list_plans(&self, tenant_id: Option<Id>) -> CampResult<Vec<CompensationPlan>> {
        authorize(self.user, Action::ManageCamps)?;
        let tenant_id = self.user.tenant_id().or(tenant_id);
        Ok(self.ctx.incentives().list_plans(tenant_id).await?)
    }

    #[instrument(skip(self, attrs), fields(user_id = self.user.id()))]
    pub async fn create_plan(&self, attrs: PlanAttributes) -> CampResult<CompensationPlan> {
        authorize(self.user, Action::ManageCamps)?;
        let tenant_id = effective_tenant(self.user, attrs.tenant_id)?;
        scoped(
            self.user,
            self.ctx.tenants().find_by_id(tenant_id).await?,
            "Tenant",
            tenant_id,
        )?;
        PlanContract.validate(&attrs)?;

        let plan = self
            .ctx
            .incentives()
            .create_plan(tenant_id, &plan_values(&attrs))
            .await?;
        info!(plan_id = plan.id, tenant_id, "Compensation plan created");
        Ok(plan)
    }

    /// The role of a plan is fixed once created
    pub async fn update_plan(&self, id: Id, params: UpdatePlanParams) -> CampResult<CompensationPlan> {
        authorize(self.user, Action::ManageCamps)?;
        let repo = self.ctx.incentives();
        let plan = scoped(self.user, repo.find_plan(id).await?, "CompensationPlan", id)?;

        let mut attrs = plan_attributes(&plan);
        params.apply_to(&mut attrs);
        PlanContract.validate(&attrs)?;

        Ok(repo.update_plan(id, &plan_values(&attrs)).await?)
    }

    /// Satisfaction score and actual expenses, entered after the camp
    pub async fn record_results(&self, camp_id: Id, params: CampResultsParams) -> CampResult<Camp> {
        authorize(self.user, Action::ManageCampStaff)?;
        let camp = self.load_camp(camp_id).await?;
        CampResultsContract.validate(&params)?;

        let camp = self
            .ctx
            .camps()
            .record_results(
                camp.id,
                params.satisfaction_score,
                params.actual_expenses_cents.map(Cents),
            )
            .await?;
        info!(camp_id, "Camp results recorded");
        Ok(camp)
    }

    pub async fn preview(&self, camp_id: Id) -> CampResult<CampIncentives> {
        authorize(self.user, Action::ManageCampStaff)?;
        let camp = self.load_camp(camp_id).await?;

        let metrics = self.metrics(&camp).await?;
        let repo = self.ctx.incentives();
        let assignments = repo.list_assignments(camp.id).await?;
        let plans = repo.list_plans(Some(camp.tenant_id)).await?;

        let user_ids: Vec<Id> = assignments.iter().map(|a| a.user_id).collect();
        let names: HashMap<Id, String> = self.ctx.users().names(&user_ids).await?.into_iter().collect();

        let payouts = assignments
            .iter()
            .map(|assignment| {
                let plan = plan_for(assignment, &plans);
                PayoutPreview {
                    assignment_id: assignment.id,
                    user_id: assignment.user_id,
                    user_name: names.get(&assignment.user_id).cloned().unwrap_or_default(),
                    role: assignment.role,
                    plan_id: plan.map(|p| p.id),
                    plan_name: plan.map(|p| p.name.clone()),
                    breakdown: plan.map(|p| compute_payout(p, &metrics)),
                }
            })
            .collect();

        Ok(CampIncentives {
            camp_id: camp.id,
            metrics,
            payouts,
            finalized: repo.payouts_for_camp(camp.id).await?,
        })
    }

    /// Store one payout per planned assignment; already-finalized
    /// assignments keep their stored payout
    #[instrument(skip(self), fields(user_id = self.user.id()))]
    pub async fn finalize(&self, camp_id: Id) -> CampResult<Vec<StaffPayout>> {
        authorize(self.user, Action::ManageCamps)?;
        let camp = self.load_camp(camp_id).await?;
        if camp.status != CampStatus::Completed {
            return Err(CampError::bad_request(
                "Payouts can only be finalized for completed camps",
            ));
        }

        let preview = self.preview(camp_id).await?;
        let mut tx = self.ctx.begin().await?;
        let mut payouts = Vec::new();
        for line in &preview.payouts {
            let (Some(plan_id), Some(breakdown)) = (line.plan_id, &line.breakdown) else {
                continue;
            };
            let breakdown_json = serde_json::to_value(breakdown)
                .map_err(|e| CampError::Internal(format!("payout breakdown: {e}")))?;
            let new = NewPayout {
                tenant_id: camp.tenant_id,
                camp_id: camp.id,
                assignment_id: line.assignment_id,
                user_id: line.user_id,
                plan_id,
                amount_cents: breakdown.total_cents,
                breakdown: breakdown_json,
            };
            payouts.push(IncentiveRepository::insert_payout(&mut tx, &new).await?);
        }
        commit(tx).await?;

        let total: Cents = payouts.iter().map(|p| p.amount_cents).sum();
        info!(camp_id, payouts = payouts.len(), total_cents = total.value(), "Payouts finalized");
        Ok(payouts)
    }

    pub async fn my_payouts(&self) -> CampResult<Vec<StaffPayout>> {
        authorize(self.user, Action::ViewOwnPayouts)?;
        Ok(self.ctx.incentives().payouts_for_user(self.user.id()).await?)
    }

    async fn load_camp(&self, camp_id: Id) -> CampResult<Camp> {
        scoped(
            self.user,
            self.ctx.camps().find_by_id(camp_id).await?,
            "Camp",
            camp_id,
        )
    }

    async fn metrics(&self, camp: &Camp) -> CampResult<CampMetrics> {
        let registrations = self.ctx.registrations();
        let enrollment = registrations
            .counts_by_status(camp.id)
            .await?
            .into_iter()
            .filter(|(status, _)| *status == RegistrationStatus::Confirmed)
            .map(|(_, count)| count)
            .sum();
        let net_revenue = registrations.collected_for_camp(camp.id).await?;
        Ok(CampMetrics::for_camp(camp, enrollment, net_revenue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn plan(id: Id, role: StaffRole, active: bool) -> CompensationPlan {
        CompensationPlan {
            id,
            tenant_id: 1,
            name: format!("plan {id}"),
            role,
            base_stipend_cents: Cents(10_000),
            enrollment_threshold: None,
            enrollment_bonus_cents: Cents::ZERO,
            per_camper_bonus_cents: Cents::ZERO,
            revenue_share: BasisPoints::ZERO,
            satisfaction_threshold: None,
            satisfaction_bonus_cents: Cents::ZERO,
            budget_bonus_cents: Cents::ZERO,
            max_payout_cents: None,
            active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn assignment(role: StaffRole, plan_id: Option<Id>) -> StaffAssignment {
        StaffAssignment {
            id: 1,
            tenant_id: 1,
            camp_id: 1,
            user_id: 1,
            role,
            plan_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_for_prefers_assigned_plan() {
        let plans = vec![
            plan(1, StaffRole::Coach, true),
            plan(2, StaffRole::Coach, true),
            plan(3, StaffRole::Director, true),
        ];
        assert_eq!(plan_for(&assignment(StaffRole::Coach, Some(2)), &plans).map(|p| p.id), Some(2));
        assert_eq!(plan_for(&assignment(StaffRole::Coach, None), &plans).map(|p| p.id), Some(1));
        assert_eq!(plan_for(&assignment(StaffRole::Director, None), &plans).map(|p| p.id), Some(3));
        // assigned plan of another role does not apply
        assert!(plan_for(&assignment(StaffRole::Director, Some(1)), &plans).is_none());
    }

    #[test]
    fn test_plan_for_skips_inactive_defaults() {
        let plans = vec![plan(1, StaffRole::Coach, false)];
        assert!(plan_for(&assignment(StaffRole::Coach, None), &plans).is_none());
    }

    #[test]
    fn test_plan_attributes_roundtrip_values() {
        let p = plan(4, StaffRole::Coach, true);
        let values = plan_values(&plan_attributes(&p));
        assert_eq!(values.base_stipend_cents, p.base_stipend_cents);
        assert_eq!(values.role, p.role);
        assert!(values.active);
    }
}

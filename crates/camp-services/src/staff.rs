//! Camp staffing

use serde::Serialize;
use tracing::info;

use camp_contracts::incentives::AssignStaffParams;
use camp_contracts::{authorize, Action, UserContext};
use camp_core::{CampError, CampResult, Id};
use camp_db::Repository;
use camp_models::{Camp, StaffAssignment, StaffRole};

use crate::base::scoped;
use crate::context::ServiceContext;

/// Assignment with the staff member's name
#[derive(Debug, Clone, Serialize)]
pub struct StaffMember {
    #[serde(flatten)]
    pub assignment: StaffAssignment,
    pub name: String,
    pub email: String,
}

pub struct StaffService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> StaffService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    async fn load_camp(&self, camp_id: Id) -> CampResult<Camp> {
        scoped(
            self.user,
            self.ctx.camps().find_by_id(camp_id).await?,
            "Camp",
            camp_id,
        )
    }

    pub async fn list(&self, camp_id: Id) -> CampResult<Vec<StaffMember>> {
        authorize(self.user, Action::ViewCampOverview)?;
        let camp = self.load_camp(camp_id).await?;

        let assignments = self.ctx.incentives().list_assignments(camp.id).await?;
        let users = self.ctx.users();
        let mut members = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let Some(user) = users.find_by_id(assignment.user_id).await? else {
                continue;
            };
            members.push(StaffMember {
                assignment,
                name: user.name,
                email: user.email,
            });
        }
        Ok(members)
    }

    pub async fn assign(&self, camp_id: Id, params: AssignStaffParams) -> CampResult<StaffAssignment> {
        authorize(self.user, Action::ManageCampStaff)?;
        let camp = self.load_camp(camp_id).await?;

        let staff = match self.ctx.users().find_by_id(params.user_id).await? {
            Some(user) if user.tenant_id == Some(camp.tenant_id) && user.active => user,
            _ => return Err(CampError::invalid("user_id", "is not a member of this licensee")),
        };
        if !params.role.accepts(staff.role) {
            return Err(CampError::invalid(
                "role",
                format!("a {} cannot work as {}", staff.role, params.role),
            ));
        }

        if let Some(plan_id) = params.plan_id {
            match self.ctx.incentives().find_plan(plan_id).await? {
                Some(plan) if plan.tenant_id == camp.tenant_id && plan.role == params.role => {}
                _ => {
                    return Err(CampError::invalid(
                        "plan_id",
                        "must be a plan of this licensee for the same role",
                    ))
                }
            }
        }

        let assignment = self
            .ctx
            .incentives()
            .assign(camp.tenant_id, camp.id, staff.id, params.role, params.plan_id)
            .await?;
        info!(
            camp_id,
            staff_id = staff.id,
            role = %params.role,
            "Staff assigned"
        );
        Ok(assignment)
    }

    /// Refused once the assignment has a finalized payout
    pub async fn remove(&self, camp_id: Id, assignment_id: Id) -> CampResult<()> {
        authorize(self.user, Action::ManageCampStaff)?;
        let camp = self.load_camp(camp_id).await?;
        let repo = self.ctx.incentives();
        match repo.find_assignment(assignment_id).await? {
            Some(a) if a.camp_id == camp.id => {}
            _ => return Err(CampError::not_found("StaffAssignment", assignment_id)),
        }
        repo.remove_assignment(assignment_id).await?;
        info!(camp_id, assignment_id, "Staff removed");
        Ok(())
    }

    /// Coaches of a camp in assignment order
    pub async fn coaches(&self, camp_id: Id) -> CampResult<Vec<Id>> {
        Ok(self
            .ctx
            .incentives()
            .list_assignments(camp_id)
            .await?
            .into_iter()
            .filter(|a| a.role == StaffRole::Coach)
            .map(|a| a.user_id)
            .collect())
    }
}

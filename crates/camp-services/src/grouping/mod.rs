//! Camper grouping

pub mod banding;

use serde::Serialize;
use tracing::info;

use camp_contracts::incentives::{GenerateGroupsParams, GroupingContract, MoveCamperParams};
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::{CampError, CampResult, Id};
use camp_db::{GroupMember, GroupRepository, NewGroup, Repository};
use camp_models::{Camp, CamperGroup};

use crate::base::{commit, scoped};
use crate::context::ServiceContext;
use crate::staff::StaffService;

pub use banding::{band_sizes, group_name, plan_groups, PlannedGroup};

#[derive(Debug, Clone, Serialize)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: CamperGroup,
    pub members: Vec<GroupMember>,
}

/// Attach members to their groups, keeping group order
pub fn with_members(groups: Vec<CamperGroup>, members: Vec<GroupMember>) -> Vec<GroupWithMembers> {
    let mut result: Vec<GroupWithMembers> = groups
        .into_iter()
        .map(|group| GroupWithMembers {
            group,
            members: Vec::new(),
        })
        .collect();
    for member in members {
        if let Some(entry) = result.iter_mut().find(|g| g.group.id == member.group_id) {
            entry.members.push(member);
        }
    }
    result
}

pub struct GroupingService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> GroupingService<'a, U> {
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

    pub async fn list(&self, camp_id: Id) -> CampResult<Vec<GroupWithMembers>> {
        authorize(self.user, Action::ViewCampOverview)?;
        let camp = self.load_camp(camp_id).await?;
        let repo = self.ctx.groups();
        let groups = repo.list(camp.id).await?;
        let members = repo.members(camp.id).await?;
        Ok(with_members(groups, members))
    }

    /// Replace the camp's groups with a fresh banding of confirmed campers
    pub async fn generate(
        &self,
        camp_id: Id,
        params: GenerateGroupsParams,
    ) -> CampResult<Vec<GroupWithMembers>> {
        authorize(self.user, Action::ManageCampStaff)?;
        GroupingContract.validate(&params)?;
        let camp = self.load_camp(camp_id).await?;

        let campers = self.ctx.registrations().confirmed_campers(camp.id).await?;
        let coaches = StaffService::new(self.ctx, self.user).coaches(camp.id).await?;
        let max_group_size = usize::try_from(params.max_group_size)
            .map_err(|_| CampError::invalid("max_group_size", "must be between 1 and 100"))?;
        let camper_count = campers.len();

        let planned = plan_groups(campers, params.strategy, max_group_size, &coaches);
        let rows: Vec<NewGroup> = planned
            .into_iter()
            .enumerate()
            .map(|(position, group)| NewGroup {
                name: group.name,
                position: i32::try_from(position).unwrap_or(i32::MAX),
                coach_id: group.coach_id,
                members: group.members,
            })
            .collect();

        let mut tx = self.ctx.begin().await?;
        GroupRepository::replace(&mut tx, camp.tenant_id, camp.id, params.strategy, &rows).await?;
        commit(tx).await?;

        info!(
            camp_id = camp.id,
            strategy = %params.strategy,
            groups = rows.len(),
            campers = camper_count,
            "Camper groups generated"
        );
        self.list(camp.id).await
    }

    /// Move one camper into another group of the same camp
    pub async fn move_camper(
        &self,
        camp_id: Id,
        params: MoveCamperParams,
    ) -> CampResult<Vec<GroupWithMembers>> {
        authorize(self.user, Action::ManageCampStaff)?;
        let camp = self.load_camp(camp_id).await?;

        match self.ctx.groups().find(params.group_id).await? {
            Some(group) if group.camp_id == camp.id => {}
            _ => return Err(CampError::not_found("CamperGroup", params.group_id)),
        }

        let mut tx = self.ctx.begin().await?;
        let moved =
            GroupRepository::move_member(&mut tx, camp.id, params.athlete_id, params.group_id)
                .await?;
        if !moved {
            return Err(CampError::not_found("Athlete", params.athlete_id));
        }
        commit(tx).await?;

        info!(
            camp_id = camp.id,
            athlete_id = params.athlete_id,
            group_id = params.group_id,
            "Camper moved"
        );
        self.list(camp.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use camp_models::GroupStrategy;

    fn group(id: Id, position: i32) -> CamperGroup {
        CamperGroup {
            id,
            tenant_id: 1,
            camp_id: 2,
            name: group_name(position as usize),
            position,
            coach_id: None,
            strategy: GroupStrategy::Age,
            created_at: Utc::now(),
        }
    }

    fn member(group_id: Id, athlete_id: Id) -> GroupMember {
        GroupMember {
            group_id,
            athlete_id,
            registration_id: athlete_id * 10,
            position: 0,
            first_name: "Sam".into(),
            last_name: "Lee".into(),
            birth_date: NaiveDate::from_ymd_opt(2015, 3, 1).unwrap(),
            grade: Some(4),
        }
    }

    #[test]
    fn test_with_members_keeps_group_order() {
        let groups = vec![group(7, 0), group(5, 1), group(9, 2)];
        let members = vec![member(5, 1), member(7, 2), member(5, 3), member(42, 4)];
        let result = with_members(groups, members);

        let ids: Vec<Id> = result.iter().map(|g| g.group.id).collect();
        assert_eq!(ids, vec![7, 5, 9]);
        assert_eq!(result[0].members.len(), 1);
        assert_eq!(result[1].members.len(), 2);
        assert!(result[2].members.is_empty());
    }
}

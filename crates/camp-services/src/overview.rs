//! Single-camp overview for directors and coaches

use chrono::NaiveDate;
use serde::Serialize;

use camp_contracts::{authorize, Action, UserContext};
use camp_core::{BasisPoints, CampResult, Cents, Id};
use camp_db::Repository;
use camp_models::{Camp, CampStatus};

use crate::base::scoped;
use crate::context::ServiceContext;
use crate::dashboard::StatusCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CampPhase {
    Upcoming { days_until_start: i64 },
    InProgress { day_number: u32, total_days: i64 },
    Finished { days_since_end: i64 },
}

impl CampPhase {
    pub fn of(camp: &Camp, today: NaiveDate) -> Self {
        let dates = camp.dates();
        if today < dates.start {
            CampPhase::Upcoming {
                days_until_start: (dates.start - today).num_days(),
            }
        } else if today > dates.end {
            CampPhase::Finished {
                days_since_end: (today - dates.end).num_days(),
            }
        } else {
            CampPhase::InProgress {
                day_number: dates.day_number(today).unwrap_or(1),
                total_days: dates.days(),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampOverview {
    pub camp_id: Id,
    pub name: String,
    pub status: CampStatus,
    pub today: NaiveDate,
    pub phase: CampPhase,
    pub capacity: i32,
    pub registrations: StatusCounts,
    pub spots_remaining: i64,
    pub fill_rate: BasisPoints,
    pub checked_in_today: i64,
    pub staff_count: usize,
    pub group_count: i64,
    pub revenue_collected_cents: Cents,
}

pub struct OverviewService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> OverviewService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    pub async fn camp_overview(&self, camp_id: Id) -> CampResult<CampOverview> {
        authorize(self.user, Action::ViewCampOverview)?;
        let camp = scoped(
            self.user,
            self.ctx.camps().find_by_id(camp_id).await?,
            "Camp",
            camp_id,
        )?;
        let today = self.ctx.today();
        let phase = CampPhase::of(&camp, today);

        let mut registrations = StatusCounts::default();
        for (status, count) in self.ctx.registrations().counts_by_status(camp.id).await? {
            registrations.add(status, count);
        }

        let checked_in_today = match phase {
            CampPhase::InProgress { .. } => {
                self.ctx.attendance().count_checked_in(camp.id, today).await?
            }
            _ => 0,
        };
        let staff_count = self.ctx.incentives().list_assignments(camp.id).await?.len();
        let group_count = self.ctx.groups().count(camp.id).await?;
        let revenue_collected_cents = self.ctx.registrations().collected_for_camp(camp.id).await?;

        Ok(build_overview(
            &camp,
            today,
            registrations,
            checked_in_today,
            staff_count,
            group_count,
            revenue_collected_cents,
        ))
    }
}

pub fn build_overview(
    camp: &Camp,
    today: NaiveDate,
    registrations: StatusCounts,
    checked_in_today: i64,
    staff_count: usize,
    group_count: i64,
    revenue_collected_cents: Cents,
) -> CampOverview {
    let holding = registrations.pending + registrations.confirmed;
    CampOverview {
        camp_id: camp.id,
        name: camp.name.clone(),
        status: camp.status,
        today,
        phase: CampPhase::of(camp, today),
        capacity: camp.capacity,
        registrations,
        spots_remaining: camp.spots_remaining(holding),
        fill_rate: BasisPoints::ratio(registrations.confirmed, i64::from(camp.capacity)),
        checked_in_today,
        staff_count,
        group_count,
        revenue_collected_cents,
    }
}

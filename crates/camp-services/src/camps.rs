//! Camp scheduling and the public camp listing

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{info, instrument};

use camp_contracts::camps::{
    CampAttributes, CampContract, CampListParams, ChangeCampStatusParams, UpdateCampParams,
};
use camp_contracts::permissions::effective_tenant;
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::{CampError, CampResult, Cents, Id, Page, PaginationParams, StatusFlow};
use camp_db::{CampValues, CampWithEnrollment, Repository};
use camp_models::{Camp, CampStatus, Role};

use crate::base::scoped;
use crate::context::ServiceContext;
use crate::registrations::staff_tenant_filter;

/// What an anonymous visitor sees of a published camp
#[derive(Debug, Clone, Serialize)]
pub struct PublicCamp {
    pub id: Id,
    pub name: String,
    pub sport: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_start: NaiveTime,
    pub daily_end: NaiveTime,
    pub price_cents: Cents,
    pub min_age: i32,
    pub max_age: i32,
    pub spots_remaining: i64,
    pub waitlist_only: bool,
}

impl From<CampWithEnrollment> for PublicCamp {
    fn from(row: CampWithEnrollment) -> Self {
        let spots_remaining = row.camp.spots_remaining(row.active_registrations);
        let camp = row.camp;
        PublicCamp {
            id: camp.id,
            name: camp.name,
            sport: camp.sport,
            start_date: camp.start_date,
            end_date: camp.end_date,
            daily_start: camp.daily_start,
            daily_end: camp.daily_end,
            price_cents: camp.price_cents,
            min_age: camp.min_age,
            max_age: camp.max_age,
            spots_remaining,
            waitlist_only: spots_remaining == 0,
        }
    }
}

fn camp_values(attrs: &CampAttributes) -> CampValues {
    CampValues {
        venue_id: attrs.venue_id,
        name: attrs.name.trim().to_string(),
        sport: attrs.sport.trim().to_string(),
        start_date: attrs.start_date,
        end_date: attrs.end_date,
        daily_start: attrs.daily_start,
        daily_end: attrs.daily_end,
        capacity: attrs.capacity,
        price_cents: Cents(attrs.price_cents),
        min_age: attrs.min_age,
        max_age: attrs.max_age,
        director_id: attrs.director_id,
        budget_cents: attrs.budget_cents.map(Cents),
    }
}

fn camp_attributes(camp: &Camp) -> CampAttributes {
    CampAttributes {
        venue_id: camp.venue_id,
        name: camp.name.clone(),
        sport: camp.sport.clone(),
        start_date: camp.start_date,
        end_date: camp.end_date,
        daily_start: camp.daily_start,
        daily_end: camp.daily_end,
        capacity: camp.capacity,
        price_cents: camp.price_cents.value(),
        min_age: camp.min_age,
        max_age: camp.max_age,
        director_id: camp.director_id,
        budget_cents: camp.budget_cents.map(Cents::value),
    }
}

/// Completed and cancelled camps are frozen
pub fn ensure_editable(camp: &Camp) -> CampResult<()> {
    match camp.status {
        CampStatus::Completed | CampStatus::Cancelled => Err(CampError::bad_request(format!(
            "A {} camp can no longer be edited",
            camp.status
        ))),
        _ => Ok(()),
    }
}

pub struct CampService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> CampService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    pub async fn list(
        &self,
        params: CampListParams,
        page: PaginationParams,
    ) -> CampResult<Page<Camp>> {
        authorize(self.user, Action::ViewCampOverview)?;
        let tenant_id = staff_tenant_filter(self.user, params.tenant_id);
        Ok(self
            .ctx
            .camps()
            .list(tenant_id, params.status, page.normalized())
            .await?)
    }

    pub async fn get(&self, id: Id) -> CampResult<Camp> {
        authorize(self.user, Action::ViewCampOverview)?;
        scoped(self.user, self.ctx.camps().find_by_id(id).await?, "Camp", id)
    }

    /// Venue and director must belong to the camp's tenant
    async fn check_references(&self, tenant_id: Id, attrs: &CampAttributes) -> CampResult<()> {
        if let Some(venue_id) = attrs.venue_id {
            match self.ctx.venues().find_by_id(venue_id).await? {
                Some(venue) if venue.tenant_id == tenant_id && venue.active => {}
                _ => return Err(CampError::invalid("venue_id", "is not an active venue of this licensee")),
            }
        }
        if let Some(director_id) = attrs.director_id {
            match self.ctx.users().find_by_id(director_id).await? {
                Some(user)
                    if user.tenant_id == Some(tenant_id) && user.role == Role::Director && user.active => {}
                _ => return Err(CampError::invalid("director_id", "is not a director of this licensee")),
            }
        }
        Ok(())
    }

    #[instrument(skip(self, attrs), fields(user_id = self.user.id()))]
    pub async fn create(&self, tenant_id: Option<Id>, attrs: CampAttributes) -> CampResult<Camp> {
        authorize(self.user, Action::ManageCamps)?;
        let tenant_id = effective_tenant(self.user, tenant_id)?;
        CampContract.validate(&attrs)?;
        self.check_references(tenant_id, &attrs).await?;

        let camp = self.ctx.camps().create(tenant_id, &camp_values(&attrs)).await?;
        info!(camp_id = camp.id, tenant_id, "Camp created");
        Ok(camp)
    }

    pub async fn update(&self, id: Id, params: UpdateCampParams) -> CampResult<Camp> {
        authorize(self.user, Action::ManageCamps)?;
        let camp = self.get(id).await?;
        ensure_editable(&camp)?;

        let mut attrs = camp_attributes(&camp);
        params.apply_to(&mut attrs);
        CampContract.validate(&attrs)?;
        self.check_references(camp.tenant_id, &attrs).await?;

        if attrs.capacity < camp.capacity {
            let holding: i64 = self
                .ctx
                .registrations()
                .counts_by_status(camp.id)
                .await?
                .into_iter()
                .filter(|(status, _)| status.holds_spot())
                .map(|(_, count)| count)
                .sum();
            if i64::from(attrs.capacity) < holding {
                return Err(CampError::invalid(
                    "capacity",
                    format!("cannot be below the {holding} campers already holding a spot"),
                ));
            }
        }

        let updated = self.ctx.camps().update(camp.id, &camp_values(&attrs)).await?;
        info!(camp_id = updated.id, "Camp updated");
        Ok(updated)
    }

    pub async fn change_status(&self, id: Id, params: ChangeCampStatusParams) -> CampResult<Camp> {
        authorize(self.user, Action::ManageCamps)?;
        let camp = self.get(id).await?;
        let next = camp.status.transition_to(params.status)?;

        let updated = self.ctx.camps().set_status(camp.id, next).await?;
        info!(camp_id = updated.id, from = %camp.status, to = %next, "Camp status changed");
        Ok(updated)
    }
}

/// Published camps of an active tenant; no authentication
pub async fn public_listing(ctx: &ServiceContext, slug: &str) -> CampResult<Vec<PublicCamp>> {
    let tenant = match ctx.tenants().find_by_slug(slug).await? {
        Some(tenant) if tenant.is_active() => tenant,
        _ => return Err(CampError::not_found("Tenant", slug)),
    };
    let camps = ctx.camps().list_public(tenant.id).await?;
    Ok(camps.into_iter().map(PublicCamp::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn camp(status: CampStatus) -> Camp {
        Camp {
            id: 4,
            tenant_id: 1,
            venue_id: None,
            name: "Summer Soccer".into(),
            sport: "soccer".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 7, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
            daily_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            daily_end: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            capacity: 20,
            price_cents: Cents(25_000),
            min_age: 6,
            max_age: 12,
            status,
            director_id: Some(7),
            budget_cents: Some(Cents(400_000)),
            satisfaction_score: None,
            actual_expenses_cents: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_camp_spots() {
        let open = PublicCamp::from(CampWithEnrollment {
            camp: camp(CampStatus::Published),
            active_registrations: 15,
        });
        assert_eq!(open.spots_remaining, 5);
        assert!(!open.waitlist_only);

        let full = PublicCamp::from(CampWithEnrollment {
            camp: camp(CampStatus::Published),
            active_registrations: 22,
        });
        assert_eq!(full.spots_remaining, 0);
        assert!(full.waitlist_only);
    }

    #[test]
    fn test_attributes_round_trip_through_values() {
        let original = camp(CampStatus::Draft);
        let values = camp_values(&camp_attributes(&original));
        assert_eq!(values.price_cents, original.price_cents);
        assert_eq!(values.budget_cents, original.budget_cents);
        assert_eq!(values.director_id, Some(7));
        assert!(CampContract.validate(&camp_attributes(&original)).is_ok());
    }

    #[test]
    fn test_frozen_statuses() {
        assert!(ensure_editable(&camp(CampStatus::Published)).is_ok());
        assert!(ensure_editable(&camp(CampStatus::InProgress)).is_ok());
        assert_eq!(
            ensure_editable(&camp(CampStatus::Completed)).unwrap_err().status_code(),
            400
        );
        assert!(ensure_editable(&camp(CampStatus::Cancelled)).is_err());
    }
}

//! Athletes: parents manage their own children, staff of the tenant read

use serde::Deserialize;
use tracing::{info, instrument};

use camp_contracts::athletes::{AthleteAttributes, AthleteContract, UpdateAthleteParams};
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::{CampError, CampResult, Id};
use camp_db::{AthleteValues, Repository};
use camp_models::{Athlete, Role};

use crate::base::{resolve_parent, scoped};
use crate::context::ServiceContext;
use crate::registrations::staff_tenant_filter;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AthleteListParams {
    pub tenant_id: Option<Id>,
    pub parent_id: Option<Id>,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn athlete_values(attrs: &AthleteAttributes) -> AthleteValues {
    AthleteValues {
        first_name: attrs.first_name.trim().to_string(),
        last_name: attrs.last_name.trim().to_string(),
        birth_date: attrs.birth_date,
        grade: attrs.grade,
        shirt_size: trimmed(&attrs.shirt_size).map(|s| s.to_uppercase()),
        medical_notes: trimmed(&attrs.medical_notes),
        emergency_contact_name: attrs.emergency_contact_name.trim().to_string(),
        emergency_contact_phone: attrs.emergency_contact_phone.trim().to_string(),
    }
}

fn athlete_attributes(athlete: &Athlete) -> AthleteAttributes {
    AthleteAttributes {
        first_name: athlete.first_name.clone(),
        last_name: athlete.last_name.clone(),
        birth_date: athlete.birth_date,
        grade: athlete.grade,
        shirt_size: athlete.shirt_size.clone(),
        medical_notes: athlete.medical_notes.clone(),
        emergency_contact_name: athlete.emergency_contact_name.clone(),
        emergency_contact_phone: athlete.emergency_contact_phone.clone(),
        parent_id: Some(athlete.parent_id),
    }
}

pub struct AthleteService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> AthleteService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    fn is_parent(&self) -> bool {
        self.user.role() == Role::Parent
    }

    pub async fn list(&self, params: AthleteListParams) -> CampResult<Vec<Athlete>> {
        if self.is_parent() {
            return Ok(self
                .ctx
                .athletes()
                .list(self.user.tenant_id(), Some(self.user.id()))
                .await?);
        }
        authorize(self.user, Action::ViewCampOverview)?;
        let tenant_id = staff_tenant_filter(self.user, params.tenant_id);
        Ok(self.ctx.athletes().list(tenant_id, params.parent_id).await?)
    }

    /// Parents only ever see their own children
    pub async fn get(&self, id: Id) -> CampResult<Athlete> {
        let athlete = self.ctx.athletes().find_by_id(id).await?;
        if self.is_parent() {
            return match athlete {
                Some(athlete) if athlete.parent_id == self.user.id() => Ok(athlete),
                _ => Err(CampError::not_found("Athlete", id)),
            };
        }
        authorize(self.user, Action::ViewCampOverview)?;
        scoped(self.user, athlete, "Athlete", id)
    }

    #[instrument(skip(self, attrs), fields(user_id = self.user.id()))]
    pub async fn create(&self, attrs: AthleteAttributes) -> CampResult<Athlete> {
        authorize(self.user, Action::ManageAthletes)?;
        AthleteContract {
            today: self.ctx.today(),
        }
        .validate(&attrs)?;

        let parent = resolve_parent(self.ctx, self.user, attrs.parent_id).await?;
        let tenant_id = parent
            .tenant_id
            .ok_or_else(|| CampError::not_found("Parent", parent.id))?;

        let athlete = self
            .ctx
            .athletes()
            .create(tenant_id, parent.id, &athlete_values(&attrs))
            .await?;
        info!(athlete_id = athlete.id, parent_id = parent.id, tenant_id, "Athlete created");
        Ok(athlete)
    }

    pub async fn update(&self, id: Id, params: UpdateAthleteParams) -> CampResult<Athlete> {
        authorize(self.user, Action::ManageAthletes)?;
        let athlete = if self.is_parent() {
            self.get(id).await?
        } else {
            scoped(self.user, self.ctx.athletes().find_by_id(id).await?, "Athlete", id)?
        };

        let mut attrs = athlete_attributes(&athlete);
        params.apply_to(&mut attrs);
        AthleteContract {
            today: self.ctx.today(),
        }
        .validate(&attrs)?;

        let updated = self.ctx.athletes().update(athlete.id, &athlete_values(&attrs)).await?;
        info!(athlete_id = updated.id, "Athlete updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn athlete() -> Athlete {
        Athlete {
            id: 3,
            tenant_id: 1,
            parent_id: 12,
            first_name: "Sam".into(),
            last_name: "Rivera".into(),
            birth_date: NaiveDate::from_ymd_opt(2016, 4, 2).unwrap(),
            grade: Some(4),
            shirt_size: Some("YM".into()),
            medical_notes: None,
            emergency_contact_name: "Alex Rivera".into(),
            emergency_contact_phone: "555-0100".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_values_are_cleaned() {
        let mut attrs = athlete_attributes(&athlete());
        attrs.first_name = "  Sam ".into();
        attrs.shirt_size = Some(" yl ".into());
        attrs.medical_notes = Some("   ".into());

        let values = athlete_values(&attrs);
        assert_eq!(values.first_name, "Sam");
        assert_eq!(values.shirt_size.as_deref(), Some("YL"));
        assert_eq!(values.medical_notes, None);
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let mut attrs = athlete_attributes(&athlete());
        UpdateAthleteParams {
            grade: Some(5),
            ..Default::default()
        }
        .apply_to(&mut attrs);
        assert_eq!(attrs.grade, Some(5));
        assert_eq!(attrs.first_name, "Sam");
        assert_eq!(attrs.parent_id, Some(12));
    }
}

//! Daily attendance
//!
//! Staff check campers in and out by hand or through a kiosk. A camper can
//! be checked in once per camp day; repeating the check-in returns the
//! existing record.

pub mod kiosk;

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use camp_contracts::{authorize, Action, UserContext};
use camp_core::{CampError, CampResult, Id};
use camp_db::{CheckInTarget, Repository};
use camp_models::{AttendanceRecord, AttendanceState, Camp};

use crate::base::scoped;
use crate::context::{DomainCounters, ServiceContext};

pub use kiosk::{next_step, KioskEvent, KioskRegistry, KioskSession, KioskState, KioskStep};

const MAX_PICKUP_NAME: usize = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInParams {
    pub registration_id: Id,
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckOutParams {
    pub registration_id: Id,
    pub date: Option<NaiveDate>,
    pub pickup_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInOutcome {
    pub record: AttendanceRecord,
    /// `false` when the camper was already checked in that day
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub registration_id: Id,
    pub athlete_id: Id,
    pub athlete_name: String,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub state: AttendanceState,
    pub attendance: Option<AttendanceRecord>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RosterCounts {
    pub expected: usize,
    pub checked_in: usize,
    pub checked_out: usize,
    pub total: usize,
}

impl RosterCounts {
    pub fn tally(entries: &[RosterEntry]) -> Self {
        let mut counts = RosterCounts {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            match entry.state {
                AttendanceState::Expected => counts.expected += 1,
                AttendanceState::CheckedIn => counts.checked_in += 1,
                AttendanceState::CheckedOut => counts.checked_out += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    pub camp_id: Id,
    pub date: NaiveDate,
    pub entries: Vec<RosterEntry>,
    pub counts: RosterCounts,
}

/// Camp state and date checks shared by manual and kiosk check-in
pub fn ensure_camp_day(camp: &Camp, date: NaiveDate) -> CampResult<()> {
    if !camp.status.allows_check_in() {
        return Err(CampError::bad_request(format!(
            "Attendance cannot be taken for a {} camp",
            camp.status
        )));
    }
    if !camp.dates().contains(date) {
        return Err(CampError::invalid("date", "is not a day of this camp"));
    }
    Ok(())
}

pub struct CheckInService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> CheckInService<'a, U> {
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

    #[instrument(skip(self, params), fields(user_id = self.user.id()))]
    pub async fn check_in(&self, camp_id: Id, params: CheckInParams) -> CampResult<CheckInOutcome> {
        authorize(self.user, Action::CheckIn)?;
        let camp = self.load_camp(camp_id).await?;
        let date = params.date.unwrap_or_else(|| self.ctx.today());
        self.check_in_camper(&camp, params.registration_id, date).await
    }

    async fn check_in_camper(
        &self,
        camp: &Camp,
        registration_id: Id,
        date: NaiveDate,
    ) -> CampResult<CheckInOutcome> {
        ensure_camp_day(camp, date)?;
        let registration = self
            .ctx
            .registrations()
            .find_confirmed(camp.id, registration_id)
            .await?
            .ok_or_else(|| CampError::not_found("Registration", registration_id))?;

        let target = CheckInTarget {
            tenant_id: camp.tenant_id,
            camp_id: camp.id,
            registration_id: registration.id,
            athlete_id: registration.athlete_id,
            date,
        };
        let (record, created) = self.ctx.attendance().check_in(target, self.user.id()).await?;
        if created {
            DomainCounters::incr(&self.ctx.counters.check_ins, 1);
            info!(
                camp_id = camp.id,
                registration_id,
                date = %date,
                "Camper checked in"
            );
        }
        Ok(CheckInOutcome { record, created })
    }

    #[instrument(skip(self, params), fields(user_id = self.user.id()))]
    pub async fn check_out(&self, camp_id: Id, params: CheckOutParams) -> CampResult<AttendanceRecord> {
        authorize(self.user, Action::CheckIn)?;
        let camp = self.load_camp(camp_id).await?;
        let date = params.date.unwrap_or_else(|| self.ctx.today());

        let pickup = params.pickup_name.trim();
        if pickup.is_empty() {
            return Err(CampError::invalid("pickup_name", "can't be blank"));
        }
        if pickup.chars().count() > MAX_PICKUP_NAME {
            return Err(CampError::invalid("pickup_name", "is too long (maximum is 120 characters)"));
        }

        let attendance = self.ctx.attendance();
        let existing = attendance
            .find(params.registration_id, date)
            .await?
            .filter(|record| record.camp_id == camp.id)
            .ok_or_else(|| CampError::bad_request("The camper was not checked in that day"))?;
        if existing.checked_out_at.is_some() {
            return Err(CampError::bad_request("The camper was already checked out"));
        }

        let record = attendance
            .check_out(existing.registration_id, date, self.user.id(), pickup)
            .await?
            .ok_or_else(|| CampError::bad_request("The camper was already checked out"))?;
        info!(camp_id, registration_id = record.registration_id, "Camper checked out");
        Ok(record)
    }

    pub async fn roster(&self, camp_id: Id, date: Option<NaiveDate>) -> CampResult<Roster> {
        authorize(self.user, Action::CheckIn)?;
        let camp = self.load_camp(camp_id).await?;
        let date = date.unwrap_or_else(|| self.ctx.today());

        let campers = self.ctx.registrations().confirmed_campers(camp.id).await?;
        let mut records: HashMap<Id, AttendanceRecord> = self
            .ctx
            .attendance()
            .for_day(camp.id, date)
            .await?
            .into_iter()
            .map(|record| (record.registration_id, record))
            .collect();

        let entries: Vec<RosterEntry> = campers
            .into_iter()
            .map(|camper| {
                let attendance = records.remove(&camper.registration_id);
                RosterEntry {
                    registration_id: camper.registration_id,
                    athlete_id: camper.athlete.id,
                    athlete_name: camper.athlete.full_name(),
                    medical_notes: camper.athlete.medical_notes.clone(),
                    emergency_contact_name: camper.athlete.emergency_contact_name.clone(),
                    emergency_contact_phone: camper.athlete.emergency_contact_phone.clone(),
                    state: attendance
                        .as_ref()
                        .map_or(AttendanceState::Expected, AttendanceRecord::state),
                    attendance,
                }
            })
            .collect();

        Ok(Roster {
            camp_id: camp.id,
            date,
            counts: RosterCounts::tally(&entries),
            entries,
        })
    }

    pub fn open_kiosk(&self) -> CampResult<KioskSession> {
        authorize(self.user, Action::CheckIn)?;
        let session = self
            .ctx
            .kiosks
            .open(self.user.tenant_id(), self.user.id(), Utc::now());
        info!(kiosk_id = %session.id, "Kiosk opened");
        Ok(session)
    }

    pub fn kiosk(&self, id: Uuid) -> CampResult<KioskSession> {
        authorize(self.user, Action::CheckIn)?;
        self.ctx
            .kiosks
            .get(id, Utc::now())
            .filter(|session| self.can_use(session))
            .ok_or_else(|| CampError::not_found("Kiosk", id))
    }

    fn can_use(&self, session: &KioskSession) -> bool {
        match session.tenant_id {
            Some(tenant) => self.user.can_access_tenant(tenant),
            None => self.user.is_hq(),
        }
    }

    /// Apply one event; `Confirm` checks the camper in before moving on
    #[instrument(skip(self, event), fields(user_id = self.user.id(), event = event.name()))]
    pub async fn kiosk_event(&self, id: Uuid, event: KioskEvent) -> CampResult<KioskSession> {
        let session = self.kiosk(id)?;

        let next = match next_step(&session.state, &event)? {
            KioskStep::Move(next) => {
                self.check_move(&session, &next).await?;
                next
            }
            KioskStep::CheckIn {
                camp_id,
                date,
                registration_id,
            } => {
                let camp = self.kiosk_camp(&session, camp_id).await?;
                let outcome = self.check_in_camper(&camp, registration_id, date).await?;
                KioskState::Submitted {
                    camp_id,
                    date,
                    registration_id,
                    attendance_id: outcome.record.id,
                }
            }
        };

        self.ctx
            .kiosks
            .advance(session.id, session.version, next, Utc::now())
    }

    /// Database checks for plain moves
    async fn check_move(&self, session: &KioskSession, next: &KioskState) -> CampResult<()> {
        match next {
            KioskState::CampSelected { camp_id, date } => {
                let camp = self.kiosk_camp(session, *camp_id).await?;
                ensure_camp_day(&camp, *date)
            }
            KioskState::Onboarding {
                camp_id,
                registration_id,
                ..
            } => {
                self.ctx
                    .registrations()
                    .find_confirmed(*camp_id, *registration_id)
                    .await?
                    .ok_or_else(|| CampError::not_found("Registration", *registration_id))?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn kiosk_camp(&self, session: &KioskSession, camp_id: Id) -> CampResult<Camp> {
        let camp = self.load_camp(camp_id).await?;
        match session.tenant_id {
            Some(tenant) if tenant != camp.tenant_id => Err(CampError::not_found("Camp", camp_id)),
            _ => Ok(camp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camp_core::Cents;
    use camp_models::{Athlete, CampStatus};
    use chrono::NaiveTime;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, d).unwrap()
    }

    fn camp(status: CampStatus) -> Camp {
        Camp {
            id: 1,
            tenant_id: 1,
            venue_id: None,
            name: "Summer Soccer".into(),
            sport: "soccer".into(),
            start_date: date(6),
            end_date: date(10),
            daily_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            daily_end: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            capacity: 40,
            price_cents: Cents(29_900),
            min_age: 7,
            max_age: 12,
            status,
            director_id: None,
            budget_cents: None,
            satisfaction_score: None,
            actual_expenses_cents: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entry(state: AttendanceState) -> RosterEntry {
        let athlete = Athlete {
            id: 1,
            tenant_id: 1,
            parent_id: 1,
            first_name: "Maya".into(),
            last_name: "Lopez".into(),
            birth_date: NaiveDate::from_ymd_opt(2016, 3, 1).unwrap(),
            grade: None,
            shirt_size: None,
            medical_notes: None,
            emergency_contact_name: "Ana".into(),
            emergency_contact_phone: "555-0100".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        RosterEntry {
            registration_id: 1,
            athlete_id: athlete.id,
            athlete_name: athlete.full_name(),
            medical_notes: None,
            emergency_contact_name: athlete.emergency_contact_name.clone(),
            emergency_contact_phone: athlete.emergency_contact_phone.clone(),
            state,
            attendance: None,
        }
    }

    #[test]
    fn test_camp_day_bounds_are_inclusive() {
        let c = camp(CampStatus::InProgress);
        assert!(ensure_camp_day(&c, date(6)).is_ok());
        assert!(ensure_camp_day(&c, date(10)).is_ok());
        assert!(ensure_camp_day(&c, date(5)).is_err());
        assert!(ensure_camp_day(&c, date(11)).is_err());
    }

    #[test]
    fn test_camp_day_requires_running_status() {
        assert!(ensure_camp_day(&camp(CampStatus::Draft), date(6)).is_err());
        assert!(ensure_camp_day(&camp(CampStatus::Completed), date(6)).is_err());
        assert!(ensure_camp_day(&camp(CampStatus::Published), date(6)).is_ok());
    }

    #[test]
    fn test_roster_counts() {
        let entries = vec![
            entry(AttendanceState::Expected),
            entry(AttendanceState::CheckedIn),
            entry(AttendanceState::CheckedIn),
            entry(AttendanceState::CheckedOut),
        ];
        assert_eq!(
            RosterCounts::tally(&entries),
            RosterCounts {
                expected: 1,
                checked_in: 2,
                checked_out: 1,
                total: 4
            }
        );
    }
}

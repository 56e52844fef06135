//! Camp model
//!
//! Table: camps

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use camp_core::{Cents, DateRange};

use crate::{Entity, Id, Identifiable, StatusFlow, TenantScoped, Timestamped};

text_enum! {
    pub enum CampStatus {
        Draft => "draft",
        Published => "published",
        RegistrationClosed => "registration_closed",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl StatusFlow for CampStatus {
    const ENTITY: &'static str = "camp";

    fn can_transition_to(&self, next: Self) -> bool {
        use CampStatus::*;
        match (*self, next) {
            (Draft, Published) => true,
            (Published, RegistrationClosed) | (RegistrationClosed, Published) => true,
            (Published, InProgress) | (RegistrationClosed, InProgress) => true,
            (InProgress, Completed) => true,
            (Completed, _) | (Cancelled, _) => false,
            (_, Cancelled) => true,
            _ => false,
        }
    }
}

impl CampStatus {
    /// Attendance can be taken in these states
    pub fn allows_check_in(&self) -> bool {
        matches!(
            self,
            CampStatus::Published | CampStatus::RegistrationClosed | CampStatus::InProgress
        )
    }

    /// Visible on the public listing
    pub fn is_public(&self) -> bool {
        *self == CampStatus::Published
    }
}

/// A scheduled camp session run by a licensee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camp {
    pub id: Id,
    pub tenant_id: Id,
    pub venue_id: Option<Id>,
    pub name: String,
    pub sport: String,
    /// First camp day (inclusive)
    pub start_date: NaiveDate,
    /// Last camp day (inclusive)
    pub end_date: NaiveDate,
    pub daily_start: NaiveTime,
    pub daily_end: NaiveTime,
    pub capacity: i32,
    pub price_cents: Cents,
    pub min_age: i32,
    pub max_age: i32,
    pub status: CampStatus,
    pub director_id: Option<Id>,
    pub budget_cents: Option<Cents>,
    /// Post-camp survey score, 0..=100
    pub satisfaction_score: Option<i32>,
    pub actual_expenses_cents: Option<Cents>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Camp {
    pub fn dates(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Free spots given the number of confirmed + pending registrations
    pub fn spots_remaining(&self, active_registrations: i64) -> i64 {
        (self.capacity as i64 - active_registrations).max(0)
    }

    /// Published and not yet started
    pub fn accepts_registrations(&self, today: NaiveDate) -> bool {
        self.status == CampStatus::Published && today < self.start_date
    }

    pub fn age_allowed(&self, age: i32) -> bool {
        self.min_age <= age && age <= self.max_age
    }
}

impl Identifiable for Camp {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Camp {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

impl Entity for Camp {
    const TABLE_NAME: &'static str = "camps";
    const TYPE_NAME: &'static str = "Camp";
}

impl TenantScoped for Camp {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_camp() -> Camp {
        Camp {
            id: 10,
            tenant_id: 1,
            venue_id: None,
            name: "Summer Soccer".into(),
            sport: "soccer".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 8).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 12).unwrap(),
            daily_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            daily_end: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            capacity: 20,
            price_cents: Cents(29_900),
            min_age: 6,
            max_age: 12,
            status: CampStatus::Published,
            director_id: None,
            budget_cents: None,
            satisfaction_score: None,
            actual_expenses_cents: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_camp_transitions() {
        use CampStatus::*;
        assert!(Draft.can_transition_to(Published));
        assert!(!Draft.can_transition_to(InProgress));
        assert!(Published.can_transition_to(RegistrationClosed));
        assert!(RegistrationClosed.can_transition_to(Published));
        assert!(RegistrationClosed.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Draft));
    }

    #[test]
    fn test_accepts_registrations_before_start_only() {
        let camp = sample_camp();
        assert!(camp.accepts_registrations(NaiveDate::from_ymd_opt(2026, 6, 7).unwrap()));
        assert!(!camp.accepts_registrations(camp.start_date));

        let mut draft = sample_camp();
        draft.status = CampStatus::Draft;
        assert!(!draft.accepts_registrations(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }

    #[test]
    fn test_spots_remaining_never_negative() {
        let camp = sample_camp();
        assert_eq!(camp.spots_remaining(5), 15);
        assert_eq!(camp.spots_remaining(25), 0);
        assert_eq!(camp.dates().days(), 5);
        assert!(camp.age_allowed(6) && camp.age_allowed(12));
        assert!(!camp.age_allowed(13));
    }
}

//! Camp contracts

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use validator::Validate;

use camp_core::error::ValidationErrors;
use camp_core::Id;
use camp_models::CampStatus;

use crate::base::{collect_derive_errors, Contract, ValidationResult};

/// Complete, writable camp attributes
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CampAttributes {
    pub venue_id: Option<Id>,
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 60, message = "must be between 1 and 60 characters"))]
    pub sport: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily_start: NaiveTime,
    pub daily_end: NaiveTime,
    #[validate(range(min = 1, max = 1000, message = "must be between 1 and 1000"))]
    pub capacity: i32,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub price_cents: i64,
    #[validate(range(min = 3, max = 18, message = "must be between 3 and 18"))]
    pub min_age: i32,
    #[validate(range(min = 3, max = 18, message = "must be between 3 and 18"))]
    pub max_age: i32,
    pub director_id: Option<Id>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub budget_cents: Option<i64>,
}

/// Patch payload; unset fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCampParams {
    pub venue_id: Option<Id>,
    pub name: Option<String>,
    pub sport: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub daily_start: Option<NaiveTime>,
    pub daily_end: Option<NaiveTime>,
    pub capacity: Option<i32>,
    pub price_cents: Option<i64>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub director_id: Option<Id>,
    pub budget_cents: Option<i64>,
}

impl UpdateCampParams {
    /// Overlay this patch on `attrs`
    pub fn apply_to(self, attrs: &mut CampAttributes) {
        if let Some(v) = self.venue_id {
            attrs.venue_id = Some(v);
        }
        if let Some(v) = self.name {
            attrs.name = v;
        }
        if let Some(v) = self.sport {
            attrs.sport = v;
        }
        if let Some(v) = self.start_date {
            attrs.start_date = v;
        }
        if let Some(v) = self.end_date {
            attrs.end_date = v;
        }
        if let Some(v) = self.daily_start {
            attrs.daily_start = v;
        }
        if let Some(v) = self.daily_end {
            attrs.daily_end = v;
        }
        if let Some(v) = self.capacity {
            attrs.capacity = v;
        }
        if let Some(v) = self.price_cents {
            attrs.price_cents = v;
        }
        if let Some(v) = self.min_age {
            attrs.min_age = v;
        }
        if let Some(v) = self.max_age {
            attrs.max_age = v;
        }
        if let Some(v) = self.director_id {
            attrs.director_id = Some(v);
        }
        if let Some(v) = self.budget_cents {
            attrs.budget_cents = Some(v);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeCampStatusParams {
    pub status: CampStatus,
}

/// Post-camp figures used by incentive payouts
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CampResultsParams {
    #[validate(range(min = 0, max = 100, message = "must be between 0 and 100"))]
    pub satisfaction_score: Option<i32>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub actual_expenses_cents: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampListParams {
    pub status: Option<CampStatus>,
    pub tenant_id: Option<Id>,
}

/// Shape rules for camp attributes; venue and director ownership are
/// checked against the database by the service
pub struct CampContract;

impl Contract<CampAttributes> for CampContract {
    fn validate(&self, attrs: &CampAttributes) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(attrs, &mut errors);

        if attrs.end_date < attrs.start_date {
            errors.add("end_date", "must not be before start_date");
        }
        if attrs.daily_end <= attrs.daily_start {
            errors.add("daily_end", "must be after daily_start");
        }
        if attrs.min_age > attrs.max_age {
            errors.add("max_age", "must not be less than min_age");
        }
        if attrs.name.trim().is_empty() && !errors.has_error("name") {
            errors.add("name", "can't be blank");
        }

        errors.into_result()
    }
}

pub struct CampResultsContract;

impl Contract<CampResultsParams> for CampResultsContract {
    fn validate(&self, params: &CampResultsParams) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(params, &mut errors);
        if params.satisfaction_score.is_none() && params.actual_expenses_cents.is_none() {
            errors.add_base("nothing to record");
        }
        errors.into_result()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn attrs() -> CampAttributes {
        CampAttributes {
            venue_id: None,
            name: "Summer Soccer".into(),
            sport: "soccer".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 8).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 12).unwrap(),
            daily_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            daily_end: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            capacity: 40,
            price_cents: 29_900,
            min_age: 6,
            max_age: 12,
            director_id: None,
            budget_cents: Some(500_000),
        }
    }

    #[test]
    fn test_valid_camp() {
        assert!(CampContract.validate(&attrs()).is_ok());
    }

    #[test]
    fn test_single_day_camp_is_valid() {
        let mut one_day = attrs();
        one_day.end_date = one_day.start_date;
        assert!(CampContract.validate(&one_day).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut bad = attrs();
        bad.capacity = 0;
        bad.min_age = 14;
        bad.max_age = 10;
        bad.end_date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        bad.daily_end = bad.daily_start;
        bad.price_cents = -1;

        let errors = CampContract.validate(&bad).unwrap_err();
        for field in ["capacity", "max_age", "end_date", "daily_end", "price_cents"] {
            assert!(errors.has_error(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_age_bounds() {
        let mut bad = attrs();
        bad.min_age = 2;
        bad.max_age = 19;
        let errors = CampContract.validate(&bad).unwrap_err();
        assert!(errors.has_error("min_age"));
        assert!(errors.has_error("max_age"));
    }

    #[test]
    fn test_patch_overlay() {
        let mut a = attrs();
        UpdateCampParams {
            capacity: Some(12),
            name: Some("Fall Ball".into()),
            ..Default::default()
        }
        .apply_to(&mut a);
        assert_eq!(a.capacity, 12);
        assert_eq!(a.name, "Fall Ball");
        assert_eq!(a.sport, "soccer");
    }

    #[test]
    fn test_results_range() {
        let bad = CampResultsParams {
            satisfaction_score: Some(101),
            actual_expenses_cents: None,
        };
        assert!(CampResultsContract
            .validate(&bad)
            .unwrap_err()
            .has_error("satisfaction_score"));
    }
}

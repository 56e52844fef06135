//! Athlete contracts

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use camp_core::error::ValidationErrors;
use camp_core::Id;

use crate::base::{collect_derive_errors, Contract, ValidationResult};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AthleteAttributes {
    #[validate(length(min = 1, max = 60, message = "must be between 1 and 60 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 60, message = "must be between 1 and 60 characters"))]
    pub last_name: String,
    pub birth_date: NaiveDate,
    /// 0 is kindergarten
    #[validate(range(min = 0, max = 12, message = "must be between 0 and 12"))]
    pub grade: Option<i32>,
    #[validate(length(max = 10, message = "is too long"))]
    pub shirt_size: Option<String>,
    #[validate(length(max = 2000, message = "is too long"))]
    pub medical_notes: Option<String>,
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub emergency_contact_name: String,
    #[validate(length(min = 7, max = 30, message = "must be between 7 and 30 characters"))]
    pub emergency_contact_phone: String,
    /// Staff creating on behalf of a parent
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAthleteParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub grade: Option<i32>,
    pub shirt_size: Option<String>,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

impl UpdateAthleteParams {
    pub fn apply_to(self, attrs: &mut AthleteAttributes) {
        if let Some(v) = self.first_name {
            attrs.first_name = v;
        }
        if let Some(v) = self.last_name {
            attrs.last_name = v;
        }
        if let Some(v) = self.birth_date {
            attrs.birth_date = v;
        }
        if let Some(v) = self.grade {
            attrs.grade = Some(v);
        }
        if let Some(v) = self.shirt_size {
            attrs.shirt_size = Some(v);
        }
        if let Some(v) = self.medical_notes {
            attrs.medical_notes = Some(v);
        }
        if let Some(v) = self.emergency_contact_name {
            attrs.emergency_contact_name = v;
        }
        if let Some(v) = self.emergency_contact_phone {
            attrs.emergency_contact_phone = v;
        }
    }
}

/// Birth dates must be in the past relative to `today`
pub struct AthleteContract {
    pub today: NaiveDate,
}

impl Contract<AthleteAttributes> for AthleteContract {
    fn validate(&self, attrs: &AthleteAttributes) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(attrs, &mut errors);
        if attrs.birth_date >= self.today {
            errors.add("birth_date", "must be in the past");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_athlete_rules() {
        let contract = AthleteContract {
            today: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        };
        let mut attrs = AthleteAttributes {
            first_name: "Sam".into(),
            last_name: "Rivera".into(),
            birth_date: NaiveDate::from_ymd_opt(2016, 4, 2).unwrap(),
            grade: Some(4),
            shirt_size: Some("YM".into()),
            medical_notes: None,
            emergency_contact_name: "Alex Rivera".into(),
            emergency_contact_phone: "555-0100".into(),
            parent_id: None,
        };
        assert!(contract.validate(&attrs).is_ok());

        attrs.birth_date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        attrs.grade = Some(13);
        attrs.emergency_contact_phone = "1".into();
        let errors = contract.validate(&attrs).unwrap_err();
        assert!(errors.has_error("birth_date"));
        assert!(errors.has_error("grade"));
        assert!(errors.has_error("emergency_contact_phone"));
    }
}

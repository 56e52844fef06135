//! Venue and venue contract contracts

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use camp_core::error::ValidationErrors;
use camp_core::Id;

use crate::base::{collect_derive_errors, Contract, ValidationResult};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VenueAttributes {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "must be between 1 and 200 characters"))]
    pub address: String,
    #[validate(length(min = 1, max = 80, message = "must be between 1 and 80 characters"))]
    pub city: String,
    #[validate(length(min = 1, max = 80, message = "must be between 1 and 80 characters"))]
    pub region: String,
    #[validate(length(min = 3, max = 12, message = "must be between 3 and 12 characters"))]
    pub postal_code: String,
    #[validate(range(min = 1, message = "must be positive"))]
    pub capacity: Option<i32>,
    pub contact_name: Option<String>,
    #[validate(email(message = "is not a valid email address"))]
    pub contact_email: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub daily_rate_cents: Option<i64>,
    pub notes: Option<String>,
    /// HQ creating for a tenant
    pub tenant_id: Option<Id>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVenueParams {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub capacity: Option<i32>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub daily_rate_cents: Option<i64>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

impl UpdateVenueParams {
    pub fn apply_to(&self, attrs: &mut VenueAttributes) {
        if let Some(v) = &self.name {
            attrs.name = v.clone();
        }
        if let Some(v) = &self.address {
            attrs.address = v.clone();
        }
        if let Some(v) = &self.city {
            attrs.city = v.clone();
        }
        if let Some(v) = &self.region {
            attrs.region = v.clone();
        }
        if let Some(v) = &self.postal_code {
            attrs.postal_code = v.clone();
        }
        if self.capacity.is_some() {
            attrs.capacity = self.capacity;
        }
        if self.contact_name.is_some() {
            attrs.contact_name = self.contact_name.clone();
        }
        if self.contact_email.is_some() {
            attrs.contact_email = self.contact_email.clone();
        }
        if self.daily_rate_cents.is_some() {
            attrs.daily_rate_cents = self.daily_rate_cents;
        }
        if self.notes.is_some() {
            attrs.notes = self.notes.clone();
        }
    }
}

pub struct VenueRules;

impl Contract<VenueAttributes> for VenueRules {
    fn validate(&self, attrs: &VenueAttributes) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(attrs, &mut errors);
        errors.into_result()
    }
}

/// Writable attributes of a venue contract (draft only)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContractAttributes {
    pub venue_id: Id,
    pub camp_id: Option<Id>,
    #[validate(length(min = 1, max = 160, message = "must be between 1 and 160 characters"))]
    pub title: String,
    pub term_start: NaiveDate,
    pub term_end: NaiveDate,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub fee_cents: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub deposit_cents: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContractParams {
    pub camp_id: Option<Id>,
    pub title: Option<String>,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub fee_cents: Option<i64>,
    pub deposit_cents: Option<i64>,
}

impl UpdateContractParams {
    pub fn apply_to(self, attrs: &mut ContractAttributes) {
        if self.camp_id.is_some() {
            attrs.camp_id = self.camp_id;
        }
        if let Some(v) = self.title {
            attrs.title = v;
        }
        if let Some(v) = self.term_start {
            attrs.term_start = v;
        }
        if let Some(v) = self.term_end {
            attrs.term_end = v;
        }
        if let Some(v) = self.fee_cents {
            attrs.fee_cents = v;
        }
        if let Some(v) = self.deposit_cents {
            attrs.deposit_cents = v;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignContractParams {
    pub signed_by: String,
}

pub struct VenueContractContract;

impl Contract<ContractAttributes> for VenueContractContract {
    fn validate(&self, attrs: &ContractAttributes) -> ValidationResult {
        let mut errors = ValidationErrors::new();
        collect_derive_errors(attrs, &mut errors);
        if attrs.term_end < attrs.term_start {
            errors.add("term_end", "must not be before term_start");
        }
        if attrs.deposit_cents > attrs.fee_cents {
            errors.add("deposit_cents", "must not exceed fee_cents");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_money_and_term() {
        let mut attrs = ContractAttributes {
            venue_id: 1,
            camp_id: None,
            title: "Field rental".into(),
            term_start: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            term_end: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            fee_cents: 100_000,
            deposit_cents: 100_000,
        };
        assert!(VenueContractContract.validate(&attrs).is_ok());

        attrs.deposit_cents = 100_001;
        attrs.term_end = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
        let errors = VenueContractContract.validate(&attrs).unwrap_err();
        assert!(errors.has_error("deposit_cents"));
        assert!(errors.has_error("term_end"));
    }

    #[test]
    fn test_venue_email() {
        let attrs = VenueAttributes {
            name: "Lincoln Park".into(),
            address: "1 Park Way".into(),
            city: "Denver".into(),
            region: "CO".into(),
            postal_code: "80202".into(),
            capacity: Some(200),
            contact_name: None,
            contact_email: Some("nope".into()),
            daily_rate_cents: Some(15_000),
            notes: None,
            tenant_id: None,
        };
        assert!(VenueRules
            .validate(&attrs)
            .unwrap_err()
            .has_error("contact_email"));
    }
}
